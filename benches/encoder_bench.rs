// Benchmark for layer encoding and request serialization
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use geoprint_rs::capabilities::parse_capabilities;
use geoprint_rs::layer::{Feature, Geometry, HttpSource, Params, VectorSource, WmsSource};
use geoprint_rs::{
    encode_layer, Bounds, CapabilityStore, EncodeContext, EncodedLayer, Layer, LayerSource, LonLat, MapState,
    PrintPage, PrintRequestBuilder, Selections, StaticLayerRegistry, Units,
};
use serde_json::{json, Map};

fn sketch_layer() -> Layer {
    let colors = ["#ff0000", "#00ff00", "#0000ff", "#ffff00"];
    let features = (0..10_000)
        .map(|i| {
            let style = json!({"strokeColor": colors[i % colors.len()], "strokeWidth": 2});
            Feature::new(Geometry::Point(LonLat::new((i % 100) as f64, (i / 100) as f64)))
                .with_style(style.as_object().cloned().unwrap_or_default())
        })
        .collect();
    Layer::new("sketch", "sketch", LayerSource::Vector(VectorSource {
        features,
        style: None,
        style_map: Default::default(),
    }))
}

fn bench_vector_encoding(c: &mut Criterion) {
    let layer = sketch_layer();
    let registry = StaticLayerRegistry::new();
    let ctx = EncodeContext {
        extent: Some(Bounds::new(0.0, 0.0, 100.0, 100.0)),
        base_url: None,
        registry: &registry,
    };
    c.bench_function("encode 10k styled features", |b| {
        b.iter(|| match encode_layer(&layer, &ctx) {
            Some(EncodedLayer::Vector(vector)) => {
                assert_eq!(vector.styles.len(), 4);
                assert_eq!(vector.geo_json.features.len(), 10_000);
            }
            other => panic!("unexpected encoding {:?}", other.map(|l| l.type_name())),
        });
    });
}

fn bench_request_build(c: &mut Criterion) {
    let caps = parse_capabilities(
        r#"{"layouts": [{"name": "A4", "map": {"width": 500, "height": 700}}],
            "dpis": [{"name": "150", "value": "150"}]}"#,
    )
    .unwrap();
    let store = CapabilityStore::from_capabilities("http://print/pdf", caps);
    let registry = StaticLayerRegistry::new();
    let layers = (0..50)
        .map(|i| {
            let mut params = Params::new();
            params.insert("LAYERS".into(), format!("layer{}", i));
            params.insert("TRANSPARENT".into(), "true".into());
            Layer::new(format!("l{}", i), format!("layer{}", i), LayerSource::Wms(WmsSource {
                http: HttpSource::new("http://wms/"),
                params,
                wmc_legend_url: None,
            }))
        })
        .collect();
    let map = MapState {
        layers,
        base_layer: Some("l0".into()),
        extent: Some(Bounds::new(0.0, 0.0, 1000.0, 1000.0)),
        center: None,
        scale: None,
        units: Units::Meters,
        projection: "EPSG:25830".into(),
        size: None,
    };
    let pages = vec![PrintPage::with_bbox(Bounds::new(0.0, 0.0, 1000.0, 1000.0))];
    let caps = store.get().unwrap();
    let mut selections = Selections::new(caps.layouts[0].clone(), caps.dpis[0].clone());
    selections.legend = true;
    let builder = PrintRequestBuilder::new(&store, &registry);

    c.bench_function("build and serialize 50-layer request with legends", |b| {
        b.iter(|| {
            let request = builder.build(&map, &pages, &selections, &Map::new()).unwrap();
            let json = request.to_json().unwrap();
            assert!(!json.is_empty());
        });
    });
}

criterion_group!(benches, bench_vector_encoding, bench_request_build);
criterion_main!(benches);
