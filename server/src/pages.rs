//! HTML pages served by the dashboard.

use geogrid::scan::{
    DEFAULT_ADDRESS, DEFAULT_KEYWORDS, MAX_RADIUS_KM, MAX_STEP_KM, MIN_RADIUS_KM, MIN_STEP_KM,
};

/// The dashboard: a form for starting scans and a table of past scans.
pub fn dashboard() -> String {
    DASHBOARD
        .replace("__ADDRESS__", &escape(DEFAULT_ADDRESS))
        .replace("__KEYWORDS__", &escape(DEFAULT_KEYWORDS))
        .replace("__MIN_RADIUS__", &MIN_RADIUS_KM.to_string())
        .replace("__MAX_RADIUS__", &MAX_RADIUS_KM.to_string())
        .replace("__MIN_STEP__", &MIN_STEP_KM.to_string())
        .replace("__MAX_STEP__", &MAX_STEP_KM.to_string())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const DASHBOARD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Geo-Grid Rank Tracker</title>
<style>
  body { font: 14px sans-serif; margin: 0; display: flex; }
  form { width: 300px; padding: 16px; background: #f4f4f4; min-height: 100vh; box-sizing: border-box; }
  label { display: block; margin-top: 10px; }
  input, select, textarea { width: 100%; box-sizing: border-box; }
  main { flex: 1; padding: 16px; }
  table { border-collapse: collapse; }
  td, th { padding: 4px 8px; border-bottom: 1px solid #ddd; text-align: left; }
  #error { color: #b00; }
</style>
</head>
<body>
<form id="scan">
  <h2>Scan</h2>
  <label>Business Profile Name <input name="business" required></label>
  <label>Business Address <input name="address" value="__ADDRESS__"></label>
  <label>Grid Shape
    <select name="shape"><option>Circle</option><option>Square</option></select>
  </label>
  <label>Radius (km) <output id="radius_out">2</output>
    <input type="range" name="radius_km" min="__MIN_RADIUS__" max="__MAX_RADIUS__" step="0.5" value="2"
      oninput="radius_out.value = this.value">
  </label>
  <label>Spacing (km) <output id="step_out">0.5</output>
    <input type="range" name="step_km" min="__MIN_STEP__" max="__MAX_STEP__" step="0.1" value="0.5"
      oninput="step_out.value = this.value">
  </label>
  <label>Keywords (one per line) <textarea name="keywords" rows="5">__KEYWORDS__</textarea></label>
  <p><button type="submit">Run Scan</button></p>
  <progress id="progress" value="0" max="1" hidden></progress>
  <p id="error"></p>
</form>
<main>
  <h2>Scans</h2>
  <table>
    <thead><tr><th>Started</th><th>Business</th><th>Address</th><th>Checks</th><th>Maps</th><th>Downloads</th></tr></thead>
    <tbody id="scans"></tbody>
  </table>
</main>
<script>
const MODES = [['org_rank', 'Organic'], ['lp_rank', 'Local Pack'], ['gmp_rank', 'Maps']];

function link(href, text) {
  const a = document.createElement('a');
  a.href = href;
  a.textContent = text;
  a.target = '_blank';
  return a;
}

function cell(row, ...children) {
  const td = row.insertCell();
  children.forEach((child, i) => {
    if (i > 0) td.append(' ');
    td.append(child);
  });
}

async function refresh() {
  const scans = await (await fetch('/scans')).json();
  const body = document.getElementById('scans');
  body.replaceChildren();
  for (const scan of scans.reverse()) {
    const row = body.insertRow();
    cell(row, new Date(scan.started_at).toLocaleString());
    cell(row, scan.business);
    cell(row, scan.address);
    cell(row, String(scan.total_checks));
    cell(row, ...MODES.map(([mode, title]) => link(`/scans/${scan.id}/map/${mode}`, title)));
    cell(row,
      link(`/scans/${scan.id}/results.csv`, 'CSV'),
      link(`/scans/${scan.id}/results.json`, 'JSON'),
      link(`/scans/${scan.id}/summary`, 'Summary'));
  }
}

async function poll(id) {
  const bar = document.getElementById('progress');
  bar.hidden = false;
  for (;;) {
    const res = await fetch(`/scans/${id}/progress`);
    const status = await res.json();
    bar.max = Math.max(status.total, 1);
    bar.value = status.completed;
    if (status.state === 'done') break;
    if (status.state === 'failed') throw new Error(status.error);
    await new Promise((resolve) => setTimeout(resolve, 1000));
  }
  bar.hidden = true;
}

document.getElementById('scan').addEventListener('submit', async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const error = document.getElementById('error');
  error.textContent = '';
  const request = {
    business: form.get('business'),
    address: form.get('address'),
    shape: form.get('shape'),
    radius_km: Number(form.get('radius_km')),
    step_km: Number(form.get('step_km')),
    keywords: form.get('keywords').split('\n').map((k) => k.trim()).filter((k) => k),
  };
  try {
    const res = await fetch('/scans', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(request),
    });
    const body = await res.json();
    if (!res.ok) throw new Error(body.error);
    await poll(body.id);
  } catch (err) {
    error.textContent = err.message;
  }
  refresh();
});

refresh();
</script>
</body>
</html>
"#;
