//! Per vehicle bit packing of speed and access into edge flags.
//!
//! All vehicles share one `Flags` word per edge.
//! Each `FlagEncoder` owns a disjoint bit range of that word, assigned once by the `EncodingManager`.
//! Within its range an encoder stores, starting at its shift:
//!
//! ```text
//! | forward access (1) | backward access (1) | speed (speed_bits) | reverse speed (speed_bits, optional) |
//! ```
//!
//! Speeds are quantized to multiples of `speed_factor` km/h.
//! A direction whose quantized speed is zero is never marked accessible,
//! so every accessible direction has a positive speed.

use serde::{Deserialize, Serialize};

mod manager;

pub use self::manager::EncodingManager;

/// Packed per edge attributes of all vehicles.
pub type Flags = u32;
/// Number of bits available in `Flags`.
pub const FLAGS_BITS: u32 = Flags::BITS;

const ACCESS_BITS: u32 = 2;
const MAX_SPEED_BITS: u32 = 16;

/// Layout parameters of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub name: String,
    /// width of each speed field
    pub speed_bits: u32,
    /// km/h per quantization step
    pub speed_factor: f64,
    /// upper bound for any stored speed in km/h
    pub max_speed: f64,
    /// store a separate speed for the backward direction
    #[serde(default)]
    pub two_directions: bool,
}

impl EncoderConfig {
    pub fn car() -> Self {
        EncoderConfig {
            name: "car".to_string(),
            speed_bits: 5,
            speed_factor: 5.0,
            max_speed: 140.0,
            two_directions: false,
        }
    }

    pub fn bike() -> Self {
        EncoderConfig {
            name: "bike".to_string(),
            speed_bits: 4,
            speed_factor: 2.0,
            max_speed: 30.0,
            two_directions: true,
        }
    }

    pub fn foot() -> Self {
        EncoderConfig {
            name: "foot".to_string(),
            speed_bits: 4,
            speed_factor: 1.0,
            max_speed: 15.0,
            two_directions: false,
        }
    }

    /// The built in configuration for a vehicle name, case insensitive.
    pub fn default_for(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "car" => Some(Self::car()),
            "bike" => Some(Self::bike()),
            "foot" => Some(Self::foot()),
            _ => None,
        }
    }

    /// Number of flag bits this vehicle occupies.
    pub fn bits(&self) -> u32 {
        ACCESS_BITS + self.speed_bits * if self.two_directions { 2 } else { 1 }
    }
}

/// Codec for the bit range of a single vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagEncoder {
    name: String,
    shift: u32,
    speed_bits: u32,
    speed_factor: f64,
    max_speed: f64,
    two_directions: bool,
    // largest quantized value we ever store, keeps every speed <= max_speed
    max_steps: u32,
}

impl FlagEncoder {
    /// Create an encoder occupying the bits starting at `shift`.
    /// Only the `EncodingManager` hands out shifts, so this stays crate internal.
    pub(crate) fn new(config: &EncoderConfig, shift: u32) -> crate::Result<FlagEncoder> {
        let invalid = |msg: &str| crate::RoutingError::InvalidEncoderConfig(format!("{}: {}", config.name, msg));

        if config.name.trim().is_empty() {
            return Err(invalid("empty vehicle name"));
        }
        if config.speed_bits == 0 || config.speed_bits > MAX_SPEED_BITS {
            return Err(invalid("speed_bits must be within 1..=16"));
        }
        if !(config.speed_factor.is_finite() && config.speed_factor > 0.0) {
            return Err(invalid("speed_factor must be positive"));
        }
        if !(config.max_speed.is_finite() && config.max_speed > 0.0) {
            return Err(invalid("max_speed must be positive"));
        }

        let field_max = (1u32 << config.speed_bits) - 1;
        // tiny slack so a max_speed that is an exact multiple of the factor is not lost to rounding
        let bound = (config.max_speed / config.speed_factor + 1e-9).floor() as u32;
        let max_steps = std::cmp::min(field_max, bound);
        if max_steps == 0 {
            return Err(invalid("max_speed is below the smallest representable speed"));
        }

        Ok(FlagEncoder {
            name: config.name.trim().to_ascii_lowercase(),
            shift,
            speed_bits: config.speed_bits,
            speed_factor: config.speed_factor,
            max_speed: config.max_speed,
            two_directions: config.two_directions,
            max_steps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    pub fn bits(&self) -> u32 {
        self.config().bits()
    }

    pub fn config(&self) -> EncoderConfig {
        EncoderConfig {
            name: self.name.clone(),
            speed_bits: self.speed_bits,
            speed_factor: self.speed_factor,
            max_speed: self.max_speed,
            two_directions: self.two_directions,
        }
    }

    /// All bits owned by this encoder.
    pub fn mask(&self) -> Flags {
        let bits = self.bits();
        let unshifted = if bits >= FLAGS_BITS { Flags::MAX } else { (1 << bits) - 1 };
        unshifted << self.shift
    }

    /// Upper bound for every speed this encoder returns, in km/h.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    fn forward_bit(&self) -> Flags {
        1 << self.shift
    }

    fn backward_bit(&self) -> Flags {
        1 << (self.shift + 1)
    }

    fn speed_shift(&self) -> u32 {
        self.shift + ACCESS_BITS
    }

    fn reverse_speed_shift(&self) -> u32 {
        self.speed_shift() + self.speed_bits
    }

    fn speed_mask(&self) -> Flags {
        (1 << self.speed_bits) - 1
    }

    fn quantize(&self, speed: f64) -> u32 {
        if !(speed.is_finite() && speed > 0.0) {
            return 0;
        }
        let steps = (speed / self.speed_factor).round();
        if steps >= self.max_steps as f64 {
            self.max_steps
        } else {
            steps as u32
        }
    }

    /// The speed actually stored for `speed`, i.e. the nearest step of the quantization table
    /// capped at `max_speed`.
    pub fn snap_speed(&self, speed: f64) -> f64 {
        self.quantize(speed) as f64 * self.speed_factor
    }

    /// Encode the same speed for both directions.
    /// The result only contains bits of this encoder, combine vehicles with `|`.
    pub fn set_properties(&self, speed: f64, forward: bool, backward: bool) -> Flags {
        self.set_directional_properties(speed, speed, forward, backward)
    }

    /// Encode separate speeds for both directions.
    /// Encoders without a reverse speed field store the forward speed only and
    /// will report it for both directions.
    pub fn set_directional_properties(&self, forward_speed: f64, backward_speed: f64, forward: bool, backward: bool) -> Flags {
        let forward_steps = self.quantize(forward_speed);
        let backward_steps = if self.two_directions { self.quantize(backward_speed) } else { forward_steps };

        let mut flags = (forward_steps << self.speed_shift()) as Flags;
        if self.two_directions {
            flags |= (backward_steps << self.reverse_speed_shift()) as Flags;
        }
        if forward && forward_steps > 0 {
            flags |= self.forward_bit();
        }
        if backward && backward_steps > 0 {
            flags |= self.backward_bit();
        }
        flags
    }

    pub fn is_forward(&self, flags: Flags) -> bool {
        flags & self.forward_bit() != 0
    }

    pub fn is_backward(&self, flags: Flags) -> bool {
        flags & self.backward_bit() != 0
    }

    pub fn is_accessible(&self, flags: Flags) -> bool {
        self.is_forward(flags) || self.is_backward(flags)
    }

    /// Forward speed in km/h.
    pub fn get_speed(&self, flags: Flags) -> f64 {
        ((flags >> self.speed_shift()) & self.speed_mask()) as f64 * self.speed_factor
    }

    /// Backward speed in km/h.
    pub fn get_reverse_speed(&self, flags: Flags) -> f64 {
        if self.two_directions {
            ((flags >> self.reverse_speed_shift()) & self.speed_mask()) as f64 * self.speed_factor
        } else {
            self.get_speed(flags)
        }
    }

    /// Clear every access bit whose direction has a zero speed.
    /// `set_properties` never produces such flags, raw imported ones may.
    pub fn sanitize(&self, flags: Flags) -> Flags {
        let mut flags = flags;
        if self.is_forward(flags) && self.get_speed(flags) <= 0.0 {
            flags &= !self.forward_bit();
        }
        if self.is_backward(flags) && self.get_reverse_speed(flags) <= 0.0 {
            flags &= !self.backward_bit();
        }
        flags
    }

    /// Flags as seen when traversing the edge against its stored direction.
    /// Bits of other encoders are left untouched.
    pub fn reverse_flags(&self, flags: Flags) -> Flags {
        let mut reversed = flags & !(self.forward_bit() | self.backward_bit());
        if self.is_forward(flags) {
            reversed |= self.backward_bit();
        }
        if self.is_backward(flags) {
            reversed |= self.forward_bit();
        }

        if self.two_directions {
            let mask = self.speed_mask();
            let forward = (flags >> self.speed_shift()) & mask;
            let backward = (flags >> self.reverse_speed_shift()) & mask;
            reversed &= !((mask << self.speed_shift()) | (mask << self.reverse_speed_shift()));
            reversed |= (backward << self.speed_shift()) | (forward << self.reverse_speed_shift());
        }
        reversed
    }
}

impl std::fmt::Display for FlagEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car_at(shift: u32) -> FlagEncoder {
        FlagEncoder::new(&EncoderConfig::car(), shift).unwrap()
    }

    #[test]
    fn snapped_speeds_round_trip() {
        for config in [EncoderConfig::car(), EncoderConfig::bike(), EncoderConfig::foot()] {
            let encoder = FlagEncoder::new(&config, 3).unwrap();
            let mut step = 1.0;
            while step * config.speed_factor <= config.max_speed {
                let speed = step * config.speed_factor;
                assert_eq!(encoder.get_speed(encoder.set_properties(speed, true, true)), speed, "{}", config.name);
                assert_eq!(encoder.get_reverse_speed(encoder.set_properties(speed, true, true)), speed, "{}", config.name);
                step += 1.0;
            }
        }
    }

    #[test]
    fn speeds_snap_to_nearest_step_and_never_exceed_max() {
        let car = car_at(0);
        assert_eq!(car.snap_speed(52.0), 50.0);
        assert_eq!(car.snap_speed(53.0), 55.0);
        assert_eq!(car.snap_speed(1000.0), 140.0);
        assert_eq!(car.get_speed(car.set_properties(1000.0, true, false)), 140.0);
        assert!(car.get_speed(car.set_properties(139.0, true, false)) <= car.max_speed());
    }

    #[test]
    fn zero_speed_blocks_access() {
        let car = car_at(0);
        let flags = car.set_properties(0.0, true, true);
        assert!(!car.is_forward(flags));
        assert!(!car.is_backward(flags));
        // 2 km/h rounds down to zero steps with a factor of 5
        assert!(!car.is_accessible(car.set_properties(2.0, true, true)));
    }

    #[test]
    fn sanitize_drops_access_without_speed() {
        let car = car_at(2);
        let no_speed = car.forward_bit() | car.backward_bit();
        assert!(car.is_accessible(no_speed));
        assert!(!car.is_accessible(car.sanitize(no_speed)));

        let oneway = car.set_properties(50.0, true, false);
        assert_eq!(car.sanitize(oneway), oneway);

        let bike = FlagEncoder::new(&EncoderConfig::bike(), 0).unwrap();
        let downhill_only = bike.set_directional_properties(20.0, 10.0, true, true) & !(bike.speed_mask() << bike.reverse_speed_shift());
        let sanitized = bike.sanitize(downhill_only);
        assert!(bike.is_forward(sanitized));
        assert!(!bike.is_backward(sanitized));
    }

    #[test]
    fn access_bits() {
        let car = car_at(4);
        let oneway = car.set_properties(50.0, true, false);
        assert!(car.is_forward(oneway));
        assert!(!car.is_backward(oneway));
        assert_eq!(oneway & !car.mask(), 0);

        let reversed = car.reverse_flags(oneway);
        assert!(!car.is_forward(reversed));
        assert!(car.is_backward(reversed));
        assert_eq!(car.get_speed(reversed), 50.0);
    }

    #[test]
    fn two_direction_speeds_swap_on_reverse() {
        let bike = FlagEncoder::new(&EncoderConfig::bike(), 7).unwrap();
        let flags = bike.set_directional_properties(10.0, 20.0, true, true);
        assert_eq!(bike.get_speed(flags), 10.0);
        assert_eq!(bike.get_reverse_speed(flags), 20.0);

        let reversed = bike.reverse_flags(flags);
        assert_eq!(bike.get_speed(reversed), 20.0);
        assert_eq!(bike.get_reverse_speed(reversed), 10.0);
        assert_eq!(bike.reverse_flags(reversed), flags);
    }

    #[test]
    fn reverse_leaves_foreign_bits_alone() {
        let car = car_at(0);
        let foreign = 0b1011 << 20;
        let flags = car.set_properties(30.0, true, false) | foreign;
        assert_eq!(car.reverse_flags(flags) & !car.mask(), foreign);
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut config = EncoderConfig::foot();
        config.speed_bits = 0;
        assert!(FlagEncoder::new(&config, 0).is_err());

        let mut config = EncoderConfig::car();
        config.max_speed = 2.0;
        assert!(FlagEncoder::new(&config, 0).is_err());

        let mut config = EncoderConfig::car();
        config.speed_factor = f64::NAN;
        assert!(FlagEncoder::new(&config, 0).is_err());
    }
}
