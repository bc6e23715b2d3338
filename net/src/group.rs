//! Element containers.
//!
//! A group delta is a run of `(index + 1, length-prefixed element delta)`
//! entries in ascending index order closed by a zero. Elements without an
//! entry receive a blank delta when it is read.

use orbitile_core::{ByteReader, ByteWriter};

use crate::{NetCompatibilityRules, NetElement, NetElementVersion, NetError};

const FULL_STATE: u8 = 0;
const DELTA_STATE: u8 = 1;

/// An ordered set of member elements.
///
/// Both peers must visit the same members in the same order.
pub trait NetGroup {
    /// Visits every member.
    fn for_each_element(&self, visit: &mut dyn FnMut(&dyn NetElement));

    /// Visits every member mutably, in the same order.
    fn for_each_element_mut(&mut self, visit: &mut dyn FnMut(&mut dyn NetElement));
}

fn element_count<G: NetGroup + ?Sized>(group: &G) -> usize {
    let mut count = 0;
    group.for_each_element(&mut |_| count += 1);
    count
}

fn init_group<G: NetGroup + ?Sized>(group: &mut G, version: Option<&NetElementVersion>) {
    group.for_each_element_mut(&mut |element| element.init_net_version(version));
}

fn store_group<G: NetGroup + ?Sized>(
    group: &G,
    writer: &mut ByteWriter,
    rules: NetCompatibilityRules,
) {
    group.for_each_element(&mut |element| {
        if element.check_with_rules(rules) {
            element.net_store(writer, rules);
        }
    });
}

fn load_group<G: NetGroup + ?Sized>(
    group: &mut G,
    reader: &mut ByteReader<'_>,
    rules: NetCompatibilityRules,
) -> Result<(), NetError> {
    let mut result = Ok(());
    group.for_each_element_mut(&mut |element| {
        if result.is_ok() && element.check_with_rules(rules) {
            result = element.net_load(reader, rules);
        }
    });
    result
}

fn write_group_delta<G: NetGroup + ?Sized>(
    group: &G,
    writer: &mut ByteWriter,
    from_version: u64,
    rules: NetCompatibilityRules,
) -> bool {
    let mut index = 0_u64;
    let mut written = false;
    group.for_each_element(&mut |element| {
        index += 1;
        if !element.check_with_rules(rules) {
            return;
        }
        let mut delta = ByteWriter::new();
        if element.write_net_delta(&mut delta, from_version, rules) {
            writer.write_vlq_u(index);
            writer.write_bytes(delta.as_bytes());
            written = true;
        }
    });
    if written {
        writer.write_vlq_u(0);
    }
    written
}

fn read_group_delta<G: NetGroup + ?Sized>(
    group: &mut G,
    reader: &mut ByteReader<'_>,
    interpolation_time: f32,
    rules: NetCompatibilityRules,
) -> Result<(), NetError> {
    let count = element_count(group);
    let mut entries = Vec::new();
    let mut last = 0_u64;
    loop {
        let index = reader.read_vlq_u()?;
        if index == 0 {
            break;
        }
        if index <= last {
            return Err(NetError::OutOfOrder { index });
        }
        if index > count as u64 {
            return Err(NetError::UnknownElement { index, count });
        }
        last = index;
        entries.push((index, reader.read_bytes()?));
    }
    log::trace!("applying {} of {} group deltas", entries.len(), count);

    let mut entries = entries.into_iter().peekable();
    let mut index = 0_u64;
    let mut result = Ok(());
    group.for_each_element_mut(&mut |element| {
        index += 1;
        if result.is_err() {
            return;
        }
        match entries.next_if(|(entry, _)| *entry == index) {
            Some((_, bytes)) => {
                let mut element_reader = ByteReader::new(bytes);
                result = element
                    .read_net_delta(&mut element_reader, interpolation_time, rules)
                    .and_then(|()| match element_reader.remaining() {
                        0 => Ok(()),
                        extra => Err(NetError::TrailingBytes(extra)),
                    });
            }
            None => element.blank_net_delta(interpolation_time),
        }
    });
    result
}

/// A group nested inside another group.
#[derive(Clone, Debug, Default)]
pub struct NetSubGroup<G> {
    group: G,
}

impl<G: NetGroup> NetSubGroup<G> {
    /// Wraps `group`.
    pub fn new(group: G) -> Self {
        Self { group }
    }

    /// The wrapped group.
    pub fn group(&self) -> &G {
        &self.group
    }

    /// The wrapped group, mutably.
    pub fn group_mut(&mut self) -> &mut G {
        &mut self.group
    }

    /// Unwraps the group.
    pub fn into_inner(self) -> G {
        self.group
    }
}

impl<G: NetGroup> NetElement for NetSubGroup<G> {
    fn init_net_version(&mut self, version: Option<&NetElementVersion>) {
        init_group(&mut self.group, version);
    }

    fn net_store(&self, writer: &mut ByteWriter, rules: NetCompatibilityRules) {
        store_group(&self.group, writer, rules);
    }

    fn net_load(
        &mut self,
        reader: &mut ByteReader<'_>,
        rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        load_group(&mut self.group, reader, rules)
    }

    fn write_net_delta(
        &self,
        writer: &mut ByteWriter,
        from_version: u64,
        rules: NetCompatibilityRules,
    ) -> bool {
        write_group_delta(&self.group, writer, from_version, rules)
    }

    fn read_net_delta(
        &mut self,
        reader: &mut ByteReader<'_>,
        interpolation_time: f32,
        rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        read_group_delta(&mut self.group, reader, interpolation_time, rules)
    }

    fn blank_net_delta(&mut self, interpolation_time: f32) {
        self.group
            .for_each_element_mut(&mut |element| element.blank_net_delta(interpolation_time));
    }

    fn enable_net_interpolation(&mut self) {
        self.group
            .for_each_element_mut(&mut |element| element.enable_net_interpolation());
    }

    fn disable_net_interpolation(&mut self) {
        self.group
            .for_each_element_mut(&mut |element| element.disable_net_interpolation());
    }

    fn tick_net_interpolation(&mut self, dt: f32) {
        self.group
            .for_each_element_mut(&mut |element| element.tick_net_interpolation(dt));
    }
}

/// Root of a replicated tree; owns the version counter.
///
/// The master calls [`write_net_state`](Self::write_net_state) once per peer
/// update and keeps the returned version as that peer's cursor. Passing 0
/// produces a full state.
#[derive(Debug)]
pub struct NetTopGroup<G> {
    group: NetSubGroup<G>,
    version: NetElementVersion,
}

impl<G: NetGroup> NetTopGroup<G> {
    /// Takes ownership of `group` and attaches its members to a new counter.
    pub fn new(group: G) -> Self {
        let version = NetElementVersion::new();
        let mut group = NetSubGroup::new(group);
        group.init_net_version(Some(&version));
        Self { group, version }
    }

    /// The replicated members.
    pub fn group(&self) -> &G {
        self.group.group()
    }

    /// The replicated members, mutably. Changes made through this are
    /// stamped with the current version.
    pub fn group_mut(&mut self) -> &mut G {
        self.group.group_mut()
    }

    /// The version changes are stamped with now.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.current()
    }

    /// Writes every change at or after `from_version`, or the full state when
    /// `from_version` is 0, and returns the cursor to pass next time.
    ///
    /// The bytes are empty when nothing changed.
    pub fn write_net_state(
        &self,
        from_version: u64,
        rules: NetCompatibilityRules,
    ) -> (Vec<u8>, u64) {
        let mut writer = ByteWriter::new();
        if from_version == 0 {
            writer.write_u8(FULL_STATE);
            self.group.net_store(&mut writer, rules);
        } else {
            let mut delta = ByteWriter::new();
            if self.group.write_net_delta(&mut delta, from_version, rules) {
                writer.write_u8(DELTA_STATE);
                writer.write_raw(delta.as_bytes());
            }
        }
        let next = self.version.increment();
        (writer.into_bytes(), next)
    }

    /// Applies bytes from [`write_net_state`](Self::write_net_state).
    pub fn read_net_state(
        &mut self,
        bytes: &[u8],
        interpolation_time: f32,
        rules: NetCompatibilityRules,
    ) -> Result<(), NetError> {
        if bytes.is_empty() {
            self.group.blank_net_delta(interpolation_time);
            return Ok(());
        }
        let mut reader = ByteReader::new(bytes);
        match reader.read_u8()? {
            FULL_STATE => self.group.net_load(&mut reader, rules)?,
            DELTA_STATE => {
                self.group
                    .read_net_delta(&mut reader, interpolation_time, rules)?
            }
            kind => return Err(NetError::UnknownStateKind(kind)),
        }
        match reader.remaining() {
            0 => Ok(()),
            extra => Err(NetError::TrailingBytes(extra)),
        }
    }

    /// Smooths incoming float values.
    pub fn enable_net_interpolation(&mut self) {
        self.group.enable_net_interpolation();
    }

    /// Applies incoming values at once.
    pub fn disable_net_interpolation(&mut self) {
        self.group.disable_net_interpolation();
    }

    /// Advances interpolation by `dt` seconds.
    pub fn tick_net_interpolation(&mut self, dt: f32) {
        self.group.tick_net_interpolation(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NetField, NetFloat};

    const RULES: NetCompatibilityRules = NetCompatibilityRules::CURRENT;

    #[derive(Default)]
    struct Mover {
        name: NetField<String>,
        speed: NetFloat,
        extra: NetField<bool>,
    }

    impl Mover {
        fn with_versioned_extra() -> Self {
            Self {
                extra: NetField::new(false).with_min_rules_version(2),
                ..Self::default()
            }
        }
    }

    impl NetGroup for Mover {
        fn for_each_element(&self, visit: &mut dyn FnMut(&dyn NetElement)) {
            visit(&self.name);
            visit(&self.speed);
            visit(&self.extra);
        }

        fn for_each_element_mut(&mut self, visit: &mut dyn FnMut(&mut dyn NetElement)) {
            visit(&mut self.name);
            visit(&mut self.speed);
            visit(&mut self.extra);
        }
    }

    #[test]
    fn full_state_then_deltas_follow_the_master() {
        let mut master = NetTopGroup::new(Mover::default());
        let mut slave = NetTopGroup::new(Mover::default());

        master.group_mut().name.set("rover".to_owned());
        let (bytes, cursor) = master.write_net_state(0, RULES);
        slave.read_net_state(&bytes, 0.0, RULES).expect("full state");
        assert_eq!(slave.group().name.get(), "rover");

        let (bytes, cursor) = master.write_net_state(cursor, RULES);
        assert!(bytes.is_empty());

        master.group_mut().speed.set(4.0);
        let (bytes, _) = master.write_net_state(cursor, RULES);
        slave.read_net_state(&bytes, 0.0, RULES).expect("delta");
        assert_eq!(slave.group().speed.get(), 4.0);
        assert_eq!(slave.group().name.get(), "rover");
    }

    #[test]
    fn legacy_peers_never_see_newer_fields() {
        let mut master = NetTopGroup::new(Mover::with_versioned_extra());
        let mut slave = NetTopGroup::new(Mover::with_versioned_extra());
        master.group_mut().extra.set(true);
        master.group_mut().name.set("old".to_owned());

        let legacy = NetCompatibilityRules::LEGACY;
        let (bytes, cursor) = master.write_net_state(0, legacy);
        slave.read_net_state(&bytes, 0.0, legacy).expect("full state");
        assert!(!*slave.group().extra.get());

        master.group_mut().extra.set(false);
        master.group_mut().extra.set(true);
        let (bytes, _) = master.write_net_state(cursor, legacy);
        assert!(bytes.is_empty());
    }

    #[test]
    fn malformed_deltas_are_rejected() {
        let mut slave = NetTopGroup::new(Mover::default());

        let mut out_of_range = ByteWriter::new();
        out_of_range.write_u8(DELTA_STATE);
        out_of_range.write_vlq_u(9);
        out_of_range.write_bytes(&[1]);
        out_of_range.write_vlq_u(0);
        assert!(matches!(
            slave.read_net_state(out_of_range.as_bytes(), 0.0, RULES),
            Err(NetError::UnknownElement { index: 9, count: 3 })
        ));

        let mut reversed = ByteWriter::new();
        reversed.write_u8(DELTA_STATE);
        reversed.write_vlq_u(3);
        reversed.write_bytes(&[1]);
        reversed.write_vlq_u(1);
        reversed.write_bytes(&[0]);
        reversed.write_vlq_u(0);
        assert!(matches!(
            slave.read_net_state(reversed.as_bytes(), 0.0, RULES),
            Err(NetError::OutOfOrder { index: 1 })
        ));

        assert!(matches!(
            slave.read_net_state(&[7], 0.0, RULES),
            Err(NetError::UnknownStateKind(7))
        ));
    }
}
