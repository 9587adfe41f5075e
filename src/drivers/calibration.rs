/// Reference voltage of the ESP32 ADC (volts).
pub const DEFAULT_VREF: f64 = 3.3;
/// Full-scale count of the 12-bit ADC.
pub const DEFAULT_ADC_RESOLUTION: u32 = 4095;

/// Convert a raw ADC count to volts: `(raw / resolution) * vref`.
///
/// A zero resolution or a non-finite result yields `0.0`; calibration never
/// interrupts acquisition.
pub fn adc_to_volts(raw: u32, vref: f64, resolution: u32) -> f64 {
    if resolution == 0 {
        return 0.0;
    }
    let volts = (raw as f64 / resolution as f64) * vref;
    if volts.is_finite() {
        volts
    } else {
        0.0
    }
}
