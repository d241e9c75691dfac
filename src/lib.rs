pub mod error;
pub mod grid;
pub mod logging;
pub mod nc_utils;
pub mod replace;
pub mod synthesis;
pub mod vertical;

#[cfg(test)]
pub(crate) mod test_utils;
