use super::*;
use crate::{Result, RoutingError};
use rustc_hash::FxHashMap;

/// Owns the encoders of all vehicles of a graph and the assignment of their bit ranges.
///
/// Encoders are laid out back to back in registration order, starting at bit 0.
#[derive(Debug, Clone)]
pub struct EncodingManager {
    encoders: Vec<FlagEncoder>,
    by_name: FxHashMap<String, usize>,
    bits_used: u32,
}

impl EncodingManager {
    /// Fails with `EncodingOverflow` if the vehicles need more than `FLAGS_BITS` bits in total.
    pub fn new(configs: Vec<EncoderConfig>) -> Result<EncodingManager> {
        if configs.is_empty() {
            return Err(RoutingError::InvalidEncoderConfig("at least one vehicle is required".to_string()));
        }

        let required: u32 = configs.iter().map(EncoderConfig::bits).sum();
        if required > FLAGS_BITS {
            return Err(RoutingError::EncodingOverflow {
                bits: required,
                available: FLAGS_BITS,
            });
        }

        let mut encoders = Vec::with_capacity(configs.len());
        let mut by_name = FxHashMap::default();
        let mut shift = 0;

        for config in &configs {
            let encoder = FlagEncoder::new(config, shift)?;
            if by_name.insert(encoder.name().to_string(), encoders.len()).is_some() {
                return Err(RoutingError::InvalidEncoderConfig(format!("vehicle {} registered twice", encoder.name())));
            }
            shift += encoder.bits();
            encoders.push(encoder);
        }

        Ok(EncodingManager {
            encoders,
            by_name,
            bits_used: shift,
        })
    }

    /// Build from a comma separated list of built in vehicles, e.g. `"car,foot"`.
    pub fn from_names(names: &str) -> Result<EncodingManager> {
        let configs = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| EncoderConfig::default_for(name).ok_or_else(|| RoutingError::UnsupportedVehicle(name.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Self::new(configs)
    }

    /// Lookup is case insensitive.
    pub fn get_encoder(&self, name: &str) -> Result<&FlagEncoder> {
        self.encoder_index(name)
            .map(|idx| &self.encoders[idx])
            .ok_or_else(|| RoutingError::UnsupportedVehicle(name.to_string()))
    }

    pub fn supports(&self, name: &str) -> bool {
        self.encoder_index(name).is_some()
    }

    fn encoder_index(&self, name: &str) -> Option<usize> {
        if let Some(&idx) = self.by_name.get(name) {
            return Some(idx);
        }
        self.by_name.get(&name.trim().to_ascii_lowercase()).copied()
    }

    pub fn encoders(&self) -> &[FlagEncoder] {
        &self.encoders
    }

    pub fn vehicle_names(&self) -> impl Iterator<Item = &str> {
        self.encoders.iter().map(FlagEncoder::name)
    }

    pub fn configs(&self) -> Vec<EncoderConfig> {
        self.encoders.iter().map(FlagEncoder::config).collect()
    }

    pub fn bits_used(&self) -> u32 {
        self.bits_used
    }

    /// Reverse the flags of all vehicles at once.
    pub fn reverse_flags(&self, flags: Flags) -> Flags {
        self.encoders.iter().fold(flags, |flags, encoder| encoder.reverse_flags(flags))
    }

    /// `FlagEncoder::sanitize` for all vehicles at once.
    pub fn sanitize(&self, flags: Flags) -> Flags {
        self.encoders.iter().fold(flags, |flags, encoder| encoder.sanitize(flags))
    }

    /// Is the edge usable in any direction by any vehicle?
    pub fn is_accessible_by_any(&self, flags: Flags) -> bool {
        self.encoders.iter().any(|encoder| encoder.is_accessible(flags))
    }
}

impl std::fmt::Display for EncodingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let names: Vec<&str> = self.vehicle_names().collect();
        f.write_str(&names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_ranges_are_disjoint() {
        let manager = EncodingManager::from_names("car,bike,foot").unwrap();
        let masks: Vec<Flags> = manager.encoders().iter().map(FlagEncoder::mask).collect();
        for (i, a) in masks.iter().enumerate() {
            for b in &masks[i + 1..] {
                assert_eq!(a & b, 0);
            }
        }
        assert_eq!(manager.bits_used(), 7 + 10 + 6);
    }

    #[test]
    fn vehicles_do_not_interfere() {
        let manager = EncodingManager::from_names("car,foot").unwrap();
        let car = manager.get_encoder("car").unwrap();
        let foot = manager.get_encoder("foot").unwrap();

        let flags = car.set_properties(100.0, true, false) | foot.set_properties(5.0, true, true);
        assert_eq!(car.get_speed(flags), 100.0);
        assert!(!car.is_backward(flags));
        assert_eq!(foot.get_speed(flags), 5.0);
        assert!(foot.is_backward(flags));

        let reversed = manager.reverse_flags(flags);
        assert!(car.is_backward(reversed) && !car.is_forward(reversed));
        assert!(foot.is_forward(reversed) && foot.is_backward(reversed));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let manager = EncodingManager::from_names("Car, FOOT").unwrap();
        assert!(manager.supports("car"));
        assert!(manager.supports("Foot"));
        assert!(!manager.supports("bike"));
        assert!(matches!(manager.get_encoder("bike"), Err(RoutingError::UnsupportedVehicle(_))));
    }

    #[test]
    fn unknown_vehicle_names_fail() {
        assert!(matches!(EncodingManager::from_names("car,spaceship"), Err(RoutingError::UnsupportedVehicle(name)) if name == "spaceship"));
    }

    #[test]
    fn too_many_bits_overflow() {
        let wide = |name: &str| EncoderConfig {
            name: name.to_string(),
            speed_bits: 8,
            speed_factor: 1.0,
            max_speed: 200.0,
            two_directions: true,
        };
        let res = EncodingManager::new(vec![wide("a"), wide("b")]);
        assert!(matches!(res, Err(RoutingError::EncodingOverflow { bits: 36, available: 32 })));
    }

    #[test]
    fn duplicate_vehicles_are_rejected() {
        assert!(matches!(EncodingManager::from_names("car,CAR"), Err(RoutingError::InvalidEncoderConfig(_))));
    }
}
