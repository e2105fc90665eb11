//! Sensor Registry
//!
//! Tracks every sensor the controller is allowed to ingest from: its
//! owning location (storage site or vehicle), medication zone, and
//! calibration metadata. Sensors are registered once and toggled between
//! active and retired; they are never removed while readings reference
//! them, so ids stay resolvable for the life of the engine.

use heapless::FnvIndexMap;

use crate::constants::limits::MAX_SENSORS;
use crate::events::InlineString;
use crate::thresholds::Zone;
use crate::time::Timestamp;

/// Where a sensor lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLocation {
    /// Fixed storage site (pharmacy fridge, depot freezer).
    Site(InlineString),
    /// Mounted in a delivery vehicle; readings are "in transit".
    Vehicle(InlineString),
}

impl SensorLocation {
    /// The vehicle id, if this sensor is in transit.
    pub fn vehicle(&self) -> Option<InlineString> {
        match self {
            SensorLocation::Vehicle(v) => Some(*v),
            SensorLocation::Site(_) => None,
        }
    }
}

/// Sensor lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorStatus {
    /// Accepting readings.
    Active = 0,
    /// Registered but decommissioned; readings are rejected.
    Retired = 1,
}

/// Registered sensor metadata.
#[derive(Debug, Clone, Copy)]
pub struct SensorInfo {
    /// Sensor identifier.
    pub id: InlineString,
    /// Owning location.
    pub location: SensorLocation,
    /// Medication zone assignment.
    pub zone: Zone,
    /// Last calibration time.
    pub calibrated_at: Timestamp,
    /// Lifecycle status.
    pub status: SensorStatus,
}

/// Fixed-capacity sensor registry.
pub struct SensorRegistry {
    sensors: FnvIndexMap<InlineString, SensorInfo, MAX_SENSORS>,
}

/// Registration failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry is at capacity.
    Full,
    /// A sensor with this id already exists.
    AlreadyRegistered,
}

impl SensorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sensors: FnvIndexMap::new(),
        }
    }

    /// Register a sensor once. Re-registration is an error; use
    /// [`set_status`](Self::set_status) to toggle lifecycle.
    pub fn register(&mut self, info: SensorInfo) -> Result<(), RegistryError> {
        if self.sensors.contains_key(&info.id) {
            return Err(RegistryError::AlreadyRegistered);
        }
        self.sensors
            .insert(info.id, info)
            .map(|_| ())
            .map_err(|_| RegistryError::Full)
    }

    /// Look up a sensor.
    pub fn get(&self, id: &InlineString) -> Option<&SensorInfo> {
        self.sensors.get(id)
    }

    /// Toggle a sensor's status. Returns false for unknown ids.
    pub fn set_status(&mut self, id: &InlineString, status: SensorStatus) -> bool {
        match self.sensors.get_mut(id) {
            Some(info) => {
                info.status = status;
                true
            }
            None => false,
        }
    }

    /// Update the recorded calibration time. Returns false for unknown ids.
    pub fn set_calibrated_at(&mut self, id: &InlineString, at: Timestamp) -> bool {
        match self.sensors.get_mut(id) {
            Some(info) => {
                info.calibrated_at = at;
                true
            }
            None => false,
        }
    }

    /// Move a sensor between locations (e.g. loaded onto a vehicle).
    pub fn relocate(&mut self, id: &InlineString, location: SensorLocation) -> bool {
        match self.sensors.get_mut(id) {
            Some(info) => {
                info.location = location;
                true
            }
            None => false,
        }
    }

    /// Number of registered sensors.
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    /// Iterate all registered sensors.
    pub fn iter(&self) -> impl Iterator<Item = &SensorInfo> {
        self.sensors.values()
    }
}

impl Default for SensorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(id: &str) -> SensorInfo {
        SensorInfo {
            id: InlineString::new(id).unwrap(),
            location: SensorLocation::Site(InlineString::new("depot_a").unwrap()),
            zone: Zone::Vaccines,
            calibrated_at: 0,
            status: SensorStatus::Active,
        }
    }

    #[test]
    fn register_once() {
        let mut reg = SensorRegistry::new();
        assert!(reg.register(info("s1")).is_ok());
        assert_eq!(
            reg.register(info("s1")),
            Err(RegistryError::AlreadyRegistered)
        );
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn retire_keeps_entry() {
        let mut reg = SensorRegistry::new();
        reg.register(info("s1")).unwrap();

        let id = InlineString::new("s1").unwrap();
        assert!(reg.set_status(&id, SensorStatus::Retired));
        assert_eq!(reg.get(&id).unwrap().status, SensorStatus::Retired);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn relocate_to_vehicle() {
        let mut reg = SensorRegistry::new();
        reg.register(info("s1")).unwrap();

        let id = InlineString::new("s1").unwrap();
        let van = InlineString::new("van_07").unwrap();
        assert!(reg.relocate(&id, SensorLocation::Vehicle(van)));
        assert_eq!(reg.get(&id).unwrap().location.vehicle(), Some(van));
    }
}
