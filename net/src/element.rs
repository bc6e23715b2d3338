use orbitile_core::{ByteReader, ByteWriter};

use crate::{NetCompatibilityRules, NetElementVersion, NetError};

/// A node of a replicated state tree.
///
/// A master copy writes full states with [`net_store`](Self::net_store) and
/// changes since a version with [`write_net_delta`](Self::write_net_delta);
/// a slave copy applies them with the matching read methods.
pub trait NetElement {
    /// Attaches the element to the tree's version counter.
    fn init_net_version(&mut self, version: Option<&NetElementVersion>);

    /// Writes the complete state.
    fn net_store(&self, writer: &mut ByteWriter, rules: NetCompatibilityRules);

    /// Replaces the state with one written by [`net_store`](Self::net_store).
    fn net_load(
        &mut self,
        reader: &mut ByteReader<'_>,
        rules: NetCompatibilityRules,
    ) -> Result<(), NetError>;

    /// Writes what changed at or after `from_version`. Returns false, having
    /// written nothing, when nothing changed.
    fn write_net_delta(
        &self,
        writer: &mut ByteWriter,
        from_version: u64,
        rules: NetCompatibilityRules,
    ) -> bool;

    /// Applies a delta written by [`write_net_delta`](Self::write_net_delta).
    fn read_net_delta(
        &mut self,
        reader: &mut ByteReader<'_>,
        interpolation_time: f32,
        rules: NetCompatibilityRules,
    ) -> Result<(), NetError>;

    /// Called instead of [`read_net_delta`](Self::read_net_delta) when an
    /// update carried nothing for this element.
    fn blank_net_delta(&mut self, _interpolation_time: f32) {}

    /// Smooths incoming values over their interpolation time.
    fn enable_net_interpolation(&mut self) {}

    /// Applies incoming values at once, finishing any interpolation.
    fn disable_net_interpolation(&mut self) {}

    /// Advances interpolation by `dt` seconds.
    fn tick_net_interpolation(&mut self, _dt: f32) {}

    /// Reports whether the element is exchanged under `rules`.
    fn check_with_rules(&self, _rules: NetCompatibilityRules) -> bool {
        true
    }
}
