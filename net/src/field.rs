//! Leaf elements.

use orbitile_core::{ByteReader, ByteWriter};

use crate::{NetCompatibilityRules, NetElement, NetElementVersion, NetError, NetValue};

#[derive(Clone, Debug, Default)]
struct Stamp {
    version: Option<NetElementVersion>,
    latest: u64,
    min_rules_version: u32,
}

impl Stamp {
    fn mark(&mut self) {
        self.latest = self.version.as_ref().map_or(0, NetElementVersion::current);
    }

    fn attach(&mut self, version: Option<&NetElementVersion>) {
        self.version = version.cloned();
    }

    fn changed_since(&self, from_version: u64) -> bool {
        self.latest >= from_version
    }

    fn allows(&self, rules: NetCompatibilityRules) -> bool {
        rules.allows(self.min_rules_version)
    }
}

/// A replicated value.
#[derive(Clone, Debug)]
pub struct NetField<T> {
    value: T,
    updated: bool,
    stamp: Stamp,
}

impl<T: NetValue> NetField<T> {
    /// Creates a field holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value,
            updated: false,
            stamp: Stamp::default(),
        }
    }

    /// Exchanges the field only with peers at `version` or later.
    #[must_use]
    pub fn with_min_rules_version(mut self, version: u32) -> Self {
        self.stamp.min_rules_version = version;
        self
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replaces the value; unchanged values are not resent.
    pub fn set(&mut self, value: T) {
        if self.value != value {
            self.push(value);
        }
    }

    /// Replaces the value and resends it even if unchanged.
    pub fn push(&mut self, value: T) {
        self.value = value;
        self.updated = true;
        self.stamp.mark();
    }

    /// Edits the value in place through `change`.
    pub fn update(&mut self, change: impl FnOnce(&mut T)) {
        let mut value = self.value.clone();
        change(&mut value);
        self.set(value);
    }

    /// Reports whether the value changed since the last call, locally or
    /// from the network.
    pub fn pull_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }
}

impl<T: NetValue + Default> Default for NetField<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: NetValue> NetElement for NetField<T> {
    fn init_net_version(&mut self, version: Option<&NetElementVersion>) {
        self.stamp.attach(version);
    }

    fn net_store(&self, writer: &mut ByteWriter, _rules: NetCompatibilityRules) {
        self.value.write_value(writer);
    }

    fn net_load(
        &mut self,
        reader: &mut ByteReader<'_>,
        _rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        self.value = T::read_value(reader)?;
        self.updated = true;
        self.stamp.mark();
        Ok(())
    }

    fn write_net_delta(
        &self,
        writer: &mut ByteWriter,
        from_version: u64,
        _rules: NetCompatibilityRules,
    ) -> bool {
        if !self.stamp.changed_since(from_version) {
            return false;
        }
        self.value.write_value(writer);
        true
    }

    fn read_net_delta(
        &mut self,
        reader: &mut ByteReader<'_>,
        _interpolation_time: f32,
        rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        self.net_load(reader, rules)
    }

    fn check_with_rules(&self, rules: NetCompatibilityRules) -> bool {
        self.stamp.allows(rules)
    }
}

/// A replicated `f32` that can glide to incoming values.
#[derive(Clone, Debug)]
pub struct NetFloat {
    value: f32,
    target: f32,
    start: f32,
    elapsed: f32,
    duration: f32,
    interpolate: bool,
    updated: bool,
    stamp: Stamp,
}

impl NetFloat {
    /// Creates a float holding `value`.
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self {
            value,
            target: value,
            start: value,
            elapsed: 0.0,
            duration: 0.0,
            interpolate: false,
            updated: false,
            stamp: Stamp::default(),
        }
    }

    /// Exchanges the field only with peers at `version` or later.
    #[must_use]
    pub fn with_min_rules_version(mut self, version: u32) -> Self {
        self.stamp.min_rules_version = version;
        self
    }

    /// Displayed value, part way to the target while interpolating.
    #[must_use]
    pub fn get(&self) -> f32 {
        self.value
    }

    /// Latest value received or set.
    #[must_use]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Sets the value at once.
    pub fn set(&mut self, value: f32) {
        if self.target.to_bits() == value.to_bits() && self.duration == 0.0 {
            return;
        }
        self.jump_to(value);
        self.updated = true;
        self.stamp.mark();
    }

    /// Reports whether the value changed since the last call.
    pub fn pull_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }

    fn jump_to(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.start = value;
        self.elapsed = 0.0;
        self.duration = 0.0;
    }
}

impl Default for NetFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl NetElement for NetFloat {
    fn init_net_version(&mut self, version: Option<&NetElementVersion>) {
        self.stamp.attach(version);
    }

    fn net_store(&self, writer: &mut ByteWriter, _rules: NetCompatibilityRules) {
        writer.write_f32(self.target);
    }

    fn net_load(
        &mut self,
        reader: &mut ByteReader<'_>,
        _rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        let value = reader.read_f32()?;
        self.jump_to(value);
        self.updated = true;
        self.stamp.mark();
        Ok(())
    }

    fn write_net_delta(
        &self,
        writer: &mut ByteWriter,
        from_version: u64,
        _rules: NetCompatibilityRules,
    ) -> bool {
        if !self.stamp.changed_since(from_version) {
            return false;
        }
        writer.write_f32(self.target);
        true
    }

    fn read_net_delta(
        &mut self,
        reader: &mut ByteReader<'_>,
        interpolation_time: f32,
        _rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        let value = reader.read_f32()?;
        if self.interpolate && interpolation_time > 0.0 {
            self.start = self.value;
            self.target = value;
            self.elapsed = 0.0;
            self.duration = interpolation_time;
        } else {
            self.jump_to(value);
        }
        self.updated = true;
        self.stamp.mark();
        Ok(())
    }

    fn enable_net_interpolation(&mut self) {
        self.interpolate = true;
    }

    fn disable_net_interpolation(&mut self) {
        self.interpolate = false;
        self.jump_to(self.target);
    }

    fn tick_net_interpolation(&mut self, dt: f32) {
        if self.duration <= 0.0 {
            return;
        }
        self.elapsed += dt;
        if self.elapsed >= self.duration {
            self.jump_to(self.target);
        } else {
            let t = self.elapsed / self.duration;
            self.value = self.start + (self.target - self.start) * t;
        }
    }

    fn check_with_rules(&self, rules: NetCompatibilityRules) -> bool {
        self.stamp.allows(rules)
    }
}

/// A replicated occurrence counter for one-shot happenings.
#[derive(Clone, Debug, Default)]
pub struct NetEvent {
    occurrences: u64,
    pulled: u64,
    stamp: Stamp,
}

impl NetEvent {
    /// Creates an event that has never occurred.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence.
    pub fn trigger(&mut self) {
        self.occurrences += 1;
        self.stamp.mark();
    }

    /// Occurrences since the last pull.
    pub fn pull_occurrences(&mut self) -> u64 {
        let fresh = self.occurrences.saturating_sub(self.pulled);
        self.pulled = self.occurrences;
        fresh
    }

    /// Reports whether the event occurred since the last pull.
    pub fn pull_occurred(&mut self) -> bool {
        self.pull_occurrences() > 0
    }

    /// Forgets occurrences not yet pulled.
    pub fn ignore_occurrences(&mut self) {
        self.pulled = self.occurrences;
    }
}

impl NetElement for NetEvent {
    fn init_net_version(&mut self, version: Option<&NetElementVersion>) {
        self.stamp.attach(version);
    }

    fn net_store(&self, writer: &mut ByteWriter, _rules: NetCompatibilityRules) {
        writer.write_vlq_u(self.occurrences);
    }

    // A full load only synchronises the count; past occurrences are not
    // replayed.
    fn net_load(
        &mut self,
        reader: &mut ByteReader<'_>,
        _rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        self.occurrences = reader.read_vlq_u()?;
        self.ignore_occurrences();
        self.stamp.mark();
        Ok(())
    }

    fn write_net_delta(
        &self,
        writer: &mut ByteWriter,
        from_version: u64,
        _rules: NetCompatibilityRules,
    ) -> bool {
        if !self.stamp.changed_since(from_version) {
            return false;
        }
        writer.write_vlq_u(self.occurrences);
        true
    }

    fn read_net_delta(
        &mut self,
        reader: &mut ByteReader<'_>,
        _interpolation_time: f32,
        _rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        self.occurrences = reader.read_vlq_u()?;
        self.stamp.mark();
        Ok(())
    }

    fn check_with_rules(&self, rules: NetCompatibilityRules) -> bool {
        self.stamp.allows(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: NetCompatibilityRules = NetCompatibilityRules::CURRENT;

    #[test]
    fn fields_report_changes_since_a_version() {
        let version = NetElementVersion::new();
        let mut field = NetField::new(5_i64);
        field.init_net_version(Some(&version));
        let mut writer = ByteWriter::new();
        assert!(!field.write_net_delta(&mut writer, 1, RULES));

        let _ = version.increment();
        field.set(5);
        assert!(!field.write_net_delta(&mut ByteWriter::new(), 2, RULES));
        field.set(6);
        assert!(field.write_net_delta(&mut writer, 2, RULES));
        assert!(field.pull_updated());
        assert!(!field.pull_updated());
    }

    #[test]
    fn floats_glide_when_interpolating() {
        let mut float = NetFloat::new(0.0);
        float.enable_net_interpolation();
        let mut writer = ByteWriter::new();
        writer.write_f32(10.0);
        float
            .read_net_delta(&mut ByteReader::new(writer.as_bytes()), 1.0, RULES)
            .expect("decodes");
        assert_eq!(float.get(), 0.0);
        assert_eq!(float.target(), 10.0);
        float.tick_net_interpolation(0.25);
        assert!((float.get() - 2.5).abs() < 1.0e-5);
        float.tick_net_interpolation(1.0);
        assert_eq!(float.get(), 10.0);

        float
            .read_net_delta(&mut ByteReader::new(writer.as_bytes()), 0.0, RULES)
            .expect("decodes");
        assert_eq!(float.get(), 10.0);
    }

    #[test]
    fn events_count_occurrences_but_loads_do_not_replay() {
        let mut master = NetEvent::new();
        master.trigger();
        master.trigger();
        let mut writer = ByteWriter::new();
        master.net_store(&mut writer, RULES);

        let mut joined = NetEvent::new();
        joined
            .net_load(&mut ByteReader::new(writer.as_bytes()), RULES)
            .expect("decodes");
        assert!(!joined.pull_occurred());

        master.trigger();
        let mut delta = ByteWriter::new();
        assert!(master.write_net_delta(&mut delta, 0, RULES));
        joined
            .read_net_delta(&mut ByteReader::new(delta.as_bytes()), 0.0, RULES)
            .expect("decodes");
        assert_eq!(joined.pull_occurrences(), 1);
        assert_eq!(master.pull_occurrences(), 3);
    }
}
