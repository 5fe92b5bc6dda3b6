//! `convert` command: a single unit conversion.

use crate::config::Conversion;
use basin_utils::units::convert_str;

pub fn convert_value(conversion: Conversion, value: &str) -> anyhow::Result<f64> {
    Ok(convert_str(value, conversion.function())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_value() {
        let mi2 = convert_value(Conversion::M2ToMi2, " 2589988.110336 ").unwrap();
        assert!((mi2 - 1.0).abs() < 1e-12);
        assert!(convert_value(Conversion::CmsToCfs, "ten").is_err());
    }
}
