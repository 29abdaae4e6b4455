use hu_preview::{HU_MAX, HU_MIN, WindowSpec, quantize, volume::centered_range};
use ndarray::Array2;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn bounds_stay_inside_hounsfield_range(length in -5000i32..5000, width in 0i32..10000) {
        let bounds = WindowSpec::new(length, width).bounds();
        prop_assert!(HU_MIN <= bounds.min);
        prop_assert!(bounds.min <= bounds.max);
        prop_assert!(bounds.max <= HU_MAX);
        prop_assert_eq!(bounds, WindowSpec::new(length, width).bounds());
    }

    #[test]
    fn raster_replicates_channels(
        values in proptest::collection::vec(-4000.0f32..4000.0, 1..64),
        length in -1000i32..1000,
        width in 2i32..3000,
    ) {
        let window = WindowSpec::new(length, width);
        prop_assume!(!window.bounds().is_degenerate());

        let plane = Array2::from_shape_vec((1, values.len()), values).unwrap();
        let raster = quantize(plane.view(), &window).unwrap();
        prop_assert_eq!(raster.dimensions(), (plane.ncols() as u32, 1));
        for pixel in raster.pixels() {
            let [r, g, b] = pixel.0;
            prop_assert!(r == g && g == b);
        }
    }

    #[test]
    fn quantization_is_monotonic(a in -1500i32..1500, b in -1500i32..1500, width in 2i32..2500) {
        let window = WindowSpec::new(-100, width);
        let bounds = window.bounds();
        prop_assume!(!bounds.is_degenerate());
        let (lo, hi) = (a.min(b), a.max(b));

        let plane = Array2::from_shape_vec((1, 2), vec![lo, hi]).unwrap();
        let raster = quantize(plane.view(), &window).unwrap();
        let (q_lo, q_hi) = (raster.get_pixel(0, 0).0[0], raster.get_pixel(1, 0).0[0]);
        prop_assert!(q_lo <= q_hi);

        // window ends land on the extremes of the output range
        let ends = Array2::from_shape_vec((1, 2), vec![bounds.min, bounds.max]).unwrap();
        let raster = quantize(ends.view(), &window).unwrap();
        prop_assert_eq!(raster.get_pixel(0, 0).0[0], 0);
        prop_assert_eq!(raster.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn integer_quantization_matches_integer_division(v in -1024i32..=150) {
        let plane = Array2::from_elem((1, 1), v);
        let raster = quantize(plane.view(), &WindowSpec::default()).unwrap();
        let expected = ((v + 1024) * 255 / 1174) as u8;
        prop_assert_eq!(raster.get_pixel(0, 0).0[0], expected);
    }

    #[test]
    fn centered_runs_have_requested_length(depth in 1usize..200, count in 1usize..200) {
        match centered_range(depth, count) {
            Ok(range) => {
                prop_assert_eq!(range.len(), count);
                prop_assert!(range.end <= depth);
                prop_assert!(range.contains(&(depth / 2)));
            }
            Err(_) => prop_assert!(count > depth || depth / 2 < count / 2),
        }
    }
}
