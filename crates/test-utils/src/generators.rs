//! Generators for synthetic raw radar grids and source file names.

/// A grid where every pixel holds `value`.
pub fn constant_grid(width: usize, height: usize, value: u8) -> Vec<u8> {
    vec![value; width * height]
}

/// A grid whose pixels cycle through `values` in row-major order.
///
/// # Example
///
/// ```
/// use test_utils::cycling_grid;
///
/// let grid = cycling_grid(3, 2, &[0, 80, 255]);
/// assert_eq!(grid, vec![0, 80, 255, 0, 80, 255]);
/// ```
pub fn cycling_grid(width: usize, height: usize, values: &[u8]) -> Vec<u8> {
    (0..width * height)
        .map(|i| values[i % values.len()])
        .collect()
}

/// CHMI-style source file name for a 14-digit capture stamp.
///
/// # Example
///
/// ```
/// use test_utils::source_name;
///
/// assert_eq!(source_name("20240601120000"), "T_PABV23_C_OKPR_20240601120000.hdf");
/// ```
pub fn source_name(stamp: &str) -> String {
    format!("T_PABV23_C_OKPR_{}.hdf", stamp)
}
