//! Standalone HTML rank maps.
//!
//! A map shows one numbered marker per check, colored by rank, over Google's road map tiles.
//! A heatmap of the same ranks can be toggled on from the layer control.

use crate::{
    geo::LatLng,
    scan::{Check, Mode},
};
use serde_json::{json, Value};

/// Zoom level the map opens at.
const ZOOM: u8 = 13;
/// Ranks beyond this are treated as not visible.
const MAX_VISIBLE_RANK: u32 = 10;

/// How a check is drawn on the map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkerStyle {
    pub color: &'static str,
    pub label: String,
}

/// The marker for a rank.
///
/// Ranks in the top 3 are green and ranks in the top 10 orange, both labelled with the rank.
/// Anything else is a red `X`.
pub fn marker_style(rank: Option<u32>) -> MarkerStyle {
    match rank {
        Some(r) if r <= 3 => MarkerStyle {
            color: "green",
            label: r.to_string(),
        },
        Some(r) if r <= MAX_VISIBLE_RANK => MarkerStyle {
            color: "orange",
            label: r.to_string(),
        },
        _ => MarkerStyle {
            color: "red",
            label: "X".into(),
        },
    }
}

/// The heatmap intensity of a rank.
///
/// Rank 1 is hottest. Checks without a rank are left off the heatmap entirely.
pub fn heat_weight(rank: Option<u32>) -> Option<u32> {
    rank.map(|r| (MAX_VISIBLE_RANK + 1).saturating_sub(r.max(1)))
}

/// Render a rank map for one kind of search result.
pub fn map(checks: &[Check], center: LatLng, mode: Mode) -> String {
    let markers = checks
        .iter()
        .map(|check| {
            let rank = check.rank(mode);
            let style = marker_style(rank);
            json!({
                "lat": check.lat,
                "lng": check.lng,
                "keyword": check.keyword,
                "rank": rank,
                "color": style.color,
                "label": style.label,
            })
        })
        .collect::<Vec<_>>();
    let heat = checks
        .iter()
        .filter_map(|check| {
            heat_weight(check.rank(mode)).map(|weight| json!([check.lat, check.lng, weight]))
        })
        .collect::<Vec<_>>();
    let caption = format!("{} rank", mode.title());

    TEMPLATE
        .replace("__TITLE__", &caption)
        .replace("__CENTER__", &script_json(&json!([center.lat, center.lng])))
        .replace("__ZOOM__", &ZOOM.to_string())
        .replace("__CAPTION__", &script_json(&json!(caption)))
        .replace("__MAX_RANK__", &MAX_VISIBLE_RANK.to_string())
        .replace("__HEAT__", &script_json(&Value::from(heat)))
        // Last, so that placeholder-like text in keywords is left alone.
        .replace("__MARKERS__", &script_json(&Value::from(markers)))
}

/// Serialize JSON for embedding in a `<script>` element.
fn script_json(value: &Value) -> String {
    value
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>__TITLE__</title>
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
<style>
  html, body, #map { height: 100%; margin: 0; }
  .rank {
    color: white; border-radius: 50%; width: 24px; height: 24px; line-height: 24px;
    text-align: center; font: 12px sans-serif;
  }
  .legend { background: white; padding: 6px 8px; font: 12px sans-serif; border-radius: 4px; }
  .legend .bar { width: 160px; height: 10px; background: linear-gradient(to right, green, orange, red); }
  .legend .scale { display: flex; justify-content: space-between; }
</style>
</head>
<body>
<div id="map"></div>
<script>
const CENTER = __CENTER__;
const CAPTION = __CAPTION__;
const MARKERS = __MARKERS__;
const HEAT = __HEAT__;

const map = L.map('map').setView(CENTER, __ZOOM__);
const roads = L.tileLayer('https://mt1.google.com/vt/lyrs=m&x={x}&y={y}&z={z}', {
  attribution: 'Google',
  maxZoom: 20,
}).addTo(map);

const markers = L.layerGroup(MARKERS.map((m) => {
  const icon = L.divIcon({
    className: '',
    html: '<div class="rank" style="background:' + m.color + '">' + m.label + '</div>',
    iconSize: [24, 24],
  });
  const tip = document.createElement('span');
  tip.textContent = m.keyword + ': ' + (m.rank === null ? 'not ranked' : '#' + m.rank);
  return L.marker([m.lat, m.lng], { icon }).bindTooltip(tip);
})).addTo(map);

const heat = L.heatLayer(HEAT, {
  radius: 25,
  max: __MAX_RANK__,
  gradient: { 0: 'red', 0.5: 'orange', 1: 'green' },
});

L.control.layers(
  { 'Google Roadmap': roads },
  { 'Markers': markers, 'Heatmap': heat },
  { collapsed: false },
).addTo(map);

const legend = L.control({ position: 'bottomright' });
legend.onAdd = () => {
  const div = L.DomUtil.create('div', 'legend');
  const caption = document.createElement('div');
  caption.textContent = CAPTION;
  div.appendChild(caption);
  L.DomUtil.create('div', 'bar', div);
  const scale = L.DomUtil.create('div', 'scale', div);
  scale.innerHTML = '<span>1</span><span>__MAX_RANK__</span>';
  return div;
};
legend.addTo(map);
</script>
</body>
</html>
"##;

#[cfg(test)]
mod test {
    use super::*;
    use crate::summary::test::check;

    #[test]
    fn test_marker_style() {
        assert_eq!(marker_style(Some(1)).color, "green");
        assert_eq!(marker_style(Some(3)).label, "3");
        assert_eq!(marker_style(Some(4)).color, "orange");
        assert_eq!(marker_style(Some(10)).label, "10");
        assert_eq!(
            marker_style(Some(11)),
            MarkerStyle {
                color: "red",
                label: "X".into()
            }
        );
        assert_eq!(marker_style(None), marker_style(Some(11)));
    }

    #[test]
    fn test_heat_weight() {
        assert_eq!(heat_weight(Some(1)), Some(10));
        assert_eq!(heat_weight(Some(10)), Some(1));
        assert_eq!(heat_weight(Some(11)), Some(0));
        assert_eq!(heat_weight(Some(40)), Some(0));
        assert_eq!(heat_weight(None), None);
    }

    #[test]
    fn test_map() {
        let checks = [
            check("coffee", 37.42, -122.08, (Some(2), Some(5), None)),
            check("</script><b>", 37.43, -122.09, (None, Some(1), None)),
        ];
        let html = map(&checks, LatLng::new(37.422, -122.0841), Mode::LocalPack);

        assert!(html.contains("const CENTER = [37.422,-122.0841];"));
        assert!(html.contains("<title>Local Pack rank</title>"));
        assert!(html.contains(r#""color":"orange","keyword":"coffee","label":"5""#));
        assert!(html.contains("const HEAT = [[37.42,-122.08,6],[37.43,-122.09,10]];"));

        // Keywords cannot break out of the script element.
        assert_eq!(html.matches("</script>").count(), 3);
        assert!(html.contains("\\u003c/script\\u003e\\u003cb\\u003e"));

        let organic = map(&checks, LatLng::new(37.422, -122.0841), Mode::Organic);
        assert!(organic.contains("const HEAT = [[37.42,-122.08,9]];"));
    }
}
