//! End-to-end hazard assessment over a synthetic burned valley.
//!
//! The DEM is a V-shaped valley draining south along column 7 at a 0.2
//! gradient, with 0.3 side slopes. The east half burned at high severity.

use approx::assert_relative_eq;
use burnflow_algorithms::models::{cannon2010, gartner2014, staley2017};
use burnflow_algorithms::models::staley2017::StaleyModel;
use burnflow_algorithms::prelude::*;
use burnflow_algorithms::severity;
use burnflow_algorithms::utils::intensity;
use ndarray::{s, Array2, Axis};

const ROWS: usize = 20;
const COLS: usize = 15;
const VALLEY: usize = 7;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn valley_dem() -> Raster<f64> {
    let data = Array2::from_shape_fn((ROWS, COLS), |(row, col)| {
        100.0 - 2.0 * row as f64 + 3.0 * (col as f64 - VALLEY as f64).abs()
    });
    let mut dem = Raster::from_array(data).unwrap();
    dem.set_transform(GeoTransform::new(0.0, 200.0, 10.0, -10.0));
    dem
}

fn dnbr(dem: &Raster<f64>) -> Raster<f64> {
    let data = Array2::from_shape_fn(dem.shape(), |(_, col)| if col >= VALLEY { 600.0 } else { 100.0 });
    dem.derive(data, None).unwrap()
}

/// Conditioned DEM, flow directions and a stream network split every 50 m.
///
/// Channels start where at least 30 pixels drain in: row 5 of the valley.
/// The bottom row collects at most 28 pixels beside the outlet and stays out.
fn valley_network(dem: &Raster<f64>) -> (Raster<f64>, Raster<u8>, Segments) {
    let conditioned = condition(dem, ConditionParams::default()).unwrap();
    let flow = flow_direction(&conditioned).unwrap();
    let acc = flow_accumulation(&flow, None, None).unwrap();
    let mask = acc.map(None, |a| a >= 30.0);
    let segments = Segments::new(&flow, &mask, Some(50.0)).unwrap();
    (conditioned, flow, segments)
}

#[test]
fn valley_drains_to_single_outlet() {
    init_tracing();
    let dem = valley_dem();
    let (conditioned, flow, segments) = valley_network(&dem);

    assert_eq!(conditioned.view(), dem.view());
    assert_eq!(flow.get(10, VALLEY).unwrap(), 7);
    assert_eq!(flow.get(10, VALLEY + 1).unwrap(), 6);

    assert!(segments.len() >= 2);
    assert_eq!(segments.terminal_ids().len(), 1);
    let lengths = segments.lengths();
    assert!(lengths.iter().all(|&l| l <= 50.0 + 1e-9));
    assert_relative_eq!(lengths.sum(), 140.0, epsilon = 1e-9);

    // Every channel pixel lies in the valley
    for pixels in segments.indices() {
        assert!(pixels.iter().all(|&(_, col)| col == VALLEY));
    }

    // The channel runs to the bottom edge and leaves the grid there
    let outlet = segments.outlets(true)[0];
    assert_eq!(outlet, (ROWS - 1, VALLEY));
    assert_eq!(flow.get(ROWS - 1, VALLEY).unwrap(), 7);
    let basin = catchment(&flow, outlet.0, outlet.1).unwrap();
    let npixels = segments.catchment_pixels(None).unwrap();
    let terminal = segments.is_terminal().iter().position(|&t| t).unwrap();
    let count = basin.view().iter().filter(|&&b| b).count() as f64;
    assert_eq!(npixels[terminal], count);
    assert_eq!(count, (ROWS * COLS) as f64);
}

#[test]
fn segment_terrain_statistics() {
    init_tracing();
    let dem = valley_dem();
    let (conditioned, flow, segments) = valley_network(&dem);

    // The outlet pixel drains off the grid and has no slope
    let gradients = slopes(&conditioned, &flow).unwrap();
    let slope = segments.slope(&gradients).unwrap();
    for (s, terminal) in slope.iter().zip(segments.is_terminal()) {
        if terminal {
            assert!(s.is_nan());
        } else {
            assert_relative_eq!(*s, 0.2, epsilon = 1e-12);
        }
    }
    for s in segments.summary(Statistic::NanMean, &gradients).unwrap() {
        assert_relative_eq!(s, 0.2, epsilon = 1e-12);
    }

    let theta = segments.confinement(&conditioned, ConfinementParams::default()).unwrap();
    let expected = 180.0 - 2.0 * 0.3f64.atan().to_degrees();
    for t in theta {
        assert_relative_eq!(t, expected, epsilon = 1e-9);
    }

    let ridge = relief(&conditioned, &flow).unwrap();
    let r = segments.relief(&ridge).unwrap();
    let rugged = segments.ruggedness(&ridge, None).unwrap();
    for (value, ruggedness) in r.iter().zip(rugged.iter()) {
        assert!(*value > 0.0);
        assert!(*ruggedness > 0.0);
    }
}

#[test]
fn hazard_assessment() {
    init_tracing();
    let dem = valley_dem();
    let (conditioned, flow, mut segments) = valley_network(&dem);

    let barc4 = severity::estimate(&dnbr(&dem), DEFAULT_THRESHOLDS).unwrap();
    assert_eq!(barc4.get(0, 0).unwrap(), 1);
    assert_eq!(barc4.get(0, VALLEY).unwrap(), 4);
    let modhigh = severity::mask(&barc4, &[Level::Moderate, Level::High]).unwrap();

    let ratio = segments.burn_ratio(&modhigh).unwrap();
    assert!(ratio.iter().all(|&r| r > 0.5 && r < 1.0));

    let gradients = slopes(&conditioned, &flow).unwrap();
    let kf = dem.map(None, |_| 0.2);
    let vars = staley2017::M1::variables(&segments, &modhigh, &gradients, &dnbr(&dem), &kf).unwrap();
    assert_eq!(vars.len(), segments.len());

    let durations = staley2017::DURATIONS;
    let params = staley2017::M1::parameters(&durations).unwrap();
    let p = staley2017::likelihood(&[5.0, 10.0, 20.0], &params, &vars).unwrap();
    assert_eq!(p.shape(), &[segments.len(), 3, 3]);
    for lane in p.lanes(Axis(2)) {
        assert!(lane.iter().all(|&v| v > 0.0 && v < 1.0));
        assert!(lane[0] < lane[1] && lane[1] < lane[2]);
    }

    // Rainfall thresholds for a 50% likelihood, as intensities
    let acc = staley2017::accumulation(&[0.5], &params, &vars).unwrap();
    let acc = staley2017::squeeze(acc);
    assert_eq!(acc.shape(), &[segments.len(), 3]);
    let i = intensity::from_accumulation(&acc, &durations, None).unwrap();
    let i15 = i.index_axis(Axis(1), 0).to_owned();
    assert!(i15.iter().all(|&v| v > 0.0));

    let bmh = segments.burned_area(&modhigh).unwrap() / 1e6;
    let relief = segments.relief(&relief(&conditioned, &flow).unwrap()).unwrap();
    let volumes = gartner2014::emergency(
        &i15,
        &bmh.into_dyn(),
        &relief.into_dyn(),
        &gartner2014::EmergencyParams::default(),
    )
    .unwrap();
    assert_eq!(volumes.volume.dim(), (segments.len(), 1));
    for ((v, lo), hi) in volumes.volume.iter().zip(&volumes.vmin).zip(&volumes.vmax) {
        assert!(lo < v && v < hi);
    }

    let likelihood = p.slice(s![.., 0, 1]).to_owned();
    let volume = volumes.volume.column(0).to_owned();
    let hazard = cannon2010::hazard(
        &likelihood.into_dyn(),
        &volume.into_dyn(),
        &cannon2010::Thresholds::default(),
    )
    .unwrap();
    assert!(hazard.iter().all(|&h| (1.0..=3.0).contains(&h)));

    let classes: Vec<i64> = hazard.iter().map(|&h| h as i64).collect();
    let basins = segments
        .features(FeatureType::Basins, &[("hazard", Property::Int(&classes))])
        .unwrap();
    assert_eq!(basins.len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("basins.tif");
    segments.basins().unwrap().save(&path, false).unwrap();
    assert!(path.exists());
    assert!(segments.basins().unwrap().save(&path, false).is_err());
}

#[test]
fn filtering_keeps_downstream_network() {
    init_tracing();
    let (_, _, mut segments) = valley_network(&valley_dem());
    let n = segments.len();
    let ids = segments.ids().to_vec();

    // Drop the headwater segment
    let mut keep = vec![true; n];
    keep[0] = false;
    let continuous = segments.continuous(&keep).unwrap();
    assert_eq!(continuous, keep);
    segments.keep(&continuous).unwrap();

    assert_eq!(segments.len(), n - 1);
    assert_eq!(segments.ids(), &ids[1..]);
    assert_eq!(segments.terminal_ids().len(), 1);
}
