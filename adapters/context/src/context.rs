//! Per-connection state shared by a server and one client.
//!
//! Every update is a bundle of length-prefixed parts. Server to client: rpc
//! batch, replicated state, ship chunk update. Client to server: rpc batch,
//! ship chunk update.

use orbitile_core::{ByteReader, ByteWriter, CelestialCoordinate};
use orbitile_net::{
    NetCompatibilityRules, NetElement, NetField, NetGroup, NetTopGroup,
};
use orbitile_world::{
    apply_world_chunks_update, get_world_chunks_update, read_world_chunks_update,
    write_world_chunks_update, EntityId, WorldChunks, WorldChunksUpdate,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    ContextError, EntityDamageTeam, JsonRpc, RpcError, RpcHandle, ShipUpgrades, Uuid, WarpAction,
    WorldId,
};

/// Merges an upgrade delta into the player's ship upgrades; answers `true`.
pub const METHOD_APPLY_SHIP_UPGRADES: &str = "ship.applyShipUpgrades";
/// Sets the species the player's ship is built for; answers `true`.
pub const METHOD_SET_SHIP_SPECIES: &str = "ship.setShipSpecies";
/// Puts `{entityId, items}` into a container; answers the leftover items.
pub const METHOD_CONTAINER_PUT_ITEMS: &str = "world.containerPutItems";
/// Sets a universe-wide flag; answers null.
pub const METHOD_SET_UNIVERSE_FLAG: &str = "universe.setFlag";

/// Server facilities the client may call into.
pub trait ServerContextHost {
    /// Records the species the player's ship is built for.
    fn set_ship_species(&mut self, species: &str);

    /// Puts `items` into the container `entity_id` and returns what did not
    /// fit.
    fn container_put_items(&mut self, entity_id: EntityId, items: Value) -> Result<Value, RpcError>;

    /// Sets a universe-wide flag.
    fn set_universe_flag(&mut self, flag: &str);
}

#[derive(Debug, Default)]
struct ContextState {
    orbit_warp_action: NetField<Option<WarpAction>>,
    player_world_id: NetField<WorldId>,
    is_admin: NetField<bool>,
    team: NetField<EntityDamageTeam>,
    ship_upgrades: NetField<ShipUpgrades>,
    ship_coordinate: NetField<CelestialCoordinate>,
}

impl NetGroup for ContextState {
    fn for_each_element(&self, visit: &mut dyn FnMut(&dyn NetElement)) {
        visit(&self.orbit_warp_action);
        visit(&self.player_world_id);
        visit(&self.is_admin);
        visit(&self.team);
        visit(&self.ship_upgrades);
        visit(&self.ship_coordinate);
    }

    fn for_each_element_mut(&mut self, visit: &mut dyn FnMut(&mut dyn NetElement)) {
        visit(&mut self.orbit_warp_action);
        visit(&mut self.player_world_id);
        visit(&mut self.is_admin);
        visit(&mut self.team);
        visit(&mut self.ship_upgrades);
        visit(&mut self.ship_coordinate);
    }
}

#[derive(Debug)]
struct ServerSession<H> {
    host: H,
    state: NetTopGroup<ContextState>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutItems {
    entity_id: EntityId,
    items: Value,
}

fn string_argument(arguments: &Value) -> Result<&str, RpcError> {
    arguments
        .as_str()
        .ok_or_else(|| RpcError::Malformed(format!("expected a string, got {arguments}")))
}

fn register_server_methods<H: ServerContextHost + 'static>(rpc: &mut JsonRpc<ServerSession<H>>) {
    rpc.register(METHOD_APPLY_SHIP_UPGRADES, |session, delta| {
        let upgrades = session.state.group().ship_upgrades.get().apply(&delta)?;
        session.state.group_mut().ship_upgrades.set(upgrades);
        Ok(Value::Bool(true))
    });
    rpc.register(METHOD_SET_SHIP_SPECIES, |session, arguments| {
        session.host.set_ship_species(string_argument(&arguments)?);
        Ok(Value::Bool(true))
    });
    rpc.register(METHOD_CONTAINER_PUT_ITEMS, |session, arguments| {
        let put = PutItems::deserialize(&arguments)
            .map_err(|error| RpcError::Malformed(error.to_string()))?;
        session.host.container_put_items(put.entity_id, put.items)
    });
    rpc.register(METHOD_SET_UNIVERSE_FLAG, |session, arguments| {
        session.host.set_universe_flag(string_argument(&arguments)?);
        Ok(Value::Null)
    });
}

fn write_chunks_update(writer: &mut ByteWriter, pending: &mut WorldChunksUpdate) {
    let update = std::mem::take(pending);
    if !update.is_empty() {
        log::debug!("sending {} ship chunk changes", update.len());
    }
    writer.write_bytes(&write_world_chunks_update(&update));
}

fn read_chunks_update(reader: &mut ByteReader<'_>, chunks: &mut WorldChunks) -> Result<(), ContextError> {
    let update = read_world_chunks_update(reader.read_bytes()?)?;
    if !update.is_empty() {
        log::debug!("received {} ship chunk changes", update.len());
    }
    apply_world_chunks_update(chunks, update);
    Ok(())
}

fn track_ship_chunks(current: &mut WorldChunks, pending: &mut WorldChunksUpdate, new: WorldChunks) {
    pending.extend(get_world_chunks_update(current, &new));
    *current = new;
}

fn finish(reader: &ByteReader<'_>) -> Result<(), ContextError> {
    match reader.remaining() {
        0 => Ok(()),
        extra => Err(ContextError::TrailingBytes(extra)),
    }
}

/// Authoritative side of a connection.
#[derive(Debug)]
pub struct ServerClientContext<H> {
    client_id: u16,
    player_uuid: Uuid,
    rules: NetCompatibilityRules,
    session: ServerSession<H>,
    rpc: JsonRpc<ServerSession<H>>,
    net_cursor: u64,
    ship_chunks: WorldChunks,
    ship_update: WorldChunksUpdate,
}

impl<H: ServerContextHost + 'static> ServerClientContext<H> {
    /// Context for client `client_id`, answering its calls through `host`.
    pub fn new(client_id: u16, player_uuid: Uuid, rules: NetCompatibilityRules, host: H) -> Self {
        let mut rpc = JsonRpc::new();
        register_server_methods(&mut rpc);
        Self {
            client_id,
            player_uuid,
            rules,
            session: ServerSession {
                host,
                state: NetTopGroup::new(ContextState::default()),
            },
            rpc,
            net_cursor: 0,
            ship_chunks: WorldChunks::new(),
            ship_update: WorldChunksUpdate::new(),
        }
    }
}

impl<H> ServerClientContext<H> {
    /// Connection number.
    #[must_use]
    pub const fn client_id(&self) -> u16 {
        self.client_id
    }

    /// The connected player.
    #[must_use]
    pub const fn player_uuid(&self) -> Uuid {
        self.player_uuid
    }

    /// Rules negotiated with the client.
    #[must_use]
    pub const fn rules(&self) -> NetCompatibilityRules {
        self.rules
    }

    /// Facilities the client's calls act on.
    pub fn host(&self) -> &H {
        &self.session.host
    }

    /// Facilities the client's calls act on, mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.session.host
    }

    /// Warp the player's ship is carrying out, if any.
    pub fn orbit_warp_action(&self) -> Option<&WarpAction> {
        self.session.state.group().orbit_warp_action.get().as_ref()
    }

    /// Sets the warp the player's ship is carrying out.
    pub fn set_orbit_warp_action(&mut self, action: Option<WarpAction>) {
        self.session.state.group_mut().orbit_warp_action.set(action);
    }

    /// World the player is in.
    pub fn player_world_id(&self) -> &WorldId {
        self.session.state.group().player_world_id.get()
    }

    /// Records the world the player is in.
    pub fn set_player_world_id(&mut self, world: WorldId) {
        self.session.state.group_mut().player_world_id.set(world);
    }

    /// Whether the player has admin rights.
    pub fn is_admin(&self) -> bool {
        *self.session.state.group().is_admin.get()
    }

    /// Grants or revokes admin rights.
    pub fn set_admin(&mut self, admin: bool) {
        self.session.state.group_mut().is_admin.set(admin);
    }

    /// The player's damage team.
    pub fn team(&self) -> EntityDamageTeam {
        *self.session.state.group().team.get()
    }

    /// Moves the player to another damage team.
    pub fn set_team(&mut self, team: EntityDamageTeam) {
        self.session.state.group_mut().team.set(team);
    }

    /// The player's ship upgrades.
    pub fn ship_upgrades(&self) -> &ShipUpgrades {
        self.session.state.group().ship_upgrades.get()
    }

    /// Replaces the player's ship upgrades.
    pub fn set_ship_upgrades(&mut self, upgrades: ShipUpgrades) {
        self.session.state.group_mut().ship_upgrades.set(upgrades);
    }

    /// Where the player's ship is; null while in transit.
    pub fn ship_coordinate(&self) -> CelestialCoordinate {
        *self.session.state.group().ship_coordinate.get()
    }

    /// Moves the player's ship.
    pub fn set_ship_coordinate(&mut self, coordinate: CelestialCoordinate) {
        self.session.state.group_mut().ship_coordinate.set(coordinate);
    }

    /// The server's copy of the player's ship world.
    pub fn ship_chunks(&self) -> &WorldChunks {
        &self.ship_chunks
    }

    /// Replaces the ship world, queueing the difference for the client.
    pub fn update_ship_chunks(&mut self, chunks: WorldChunks) {
        track_ship_chunks(&mut self.ship_chunks, &mut self.ship_update, chunks);
    }

    /// Queues a call to a client method.
    pub fn invoke_remote(&mut self, method: &str, arguments: Value) -> RpcHandle {
        self.rpc.invoke_remote(method, arguments)
    }

    /// Takes the client's answer to `handle` once it has arrived.
    pub fn rpc_response(&mut self, handle: &RpcHandle) -> Option<Result<Value, RpcError>> {
        self.rpc.response(handle)
    }

    /// Bundles everything the client has not seen yet.
    pub fn write_update(&mut self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&self.rpc.send());
        let (state, next) = self
            .session
            .state
            .write_net_state(self.net_cursor, self.rules);
        self.net_cursor = next;
        writer.write_bytes(&state);
        write_chunks_update(&mut writer, &mut self.ship_update);
        writer.into_bytes()
    }

    /// Applies a bundle from [`ClientContext::write_update`], running the
    /// client's calls.
    pub fn read_update(&mut self, bytes: &[u8]) -> Result<(), ContextError> {
        let mut reader = ByteReader::new(bytes);
        self.rpc.receive(reader.read_bytes()?, &mut self.session)?;
        read_chunks_update(&mut reader, &mut self.ship_chunks)?;
        finish(&reader)
    }
}

/// Client mirror of a [`ServerClientContext`].
#[derive(Debug)]
pub struct ClientContext {
    player_uuid: Uuid,
    rules: NetCompatibilityRules,
    state: NetTopGroup<ContextState>,
    rpc: JsonRpc<()>,
    ship_chunks: WorldChunks,
    ship_update: WorldChunksUpdate,
}

impl ClientContext {
    /// Context for `player_uuid` talking under `rules`.
    #[must_use]
    pub fn new(player_uuid: Uuid, rules: NetCompatibilityRules) -> Self {
        Self {
            player_uuid,
            rules,
            state: NetTopGroup::new(ContextState::default()),
            rpc: JsonRpc::new(),
            ship_chunks: WorldChunks::new(),
            ship_update: WorldChunksUpdate::new(),
        }
    }

    /// The local player.
    #[must_use]
    pub const fn player_uuid(&self) -> Uuid {
        self.player_uuid
    }

    /// Warp the player's ship is carrying out, if any.
    pub fn orbit_warp_action(&self) -> Option<&WarpAction> {
        self.state.group().orbit_warp_action.get().as_ref()
    }

    /// World the server placed the player in.
    pub fn player_world_id(&self) -> &WorldId {
        self.state.group().player_world_id.get()
    }

    /// Whether the player has admin rights.
    pub fn is_admin(&self) -> bool {
        *self.state.group().is_admin.get()
    }

    /// The player's damage team.
    pub fn team(&self) -> EntityDamageTeam {
        *self.state.group().team.get()
    }

    /// The player's ship upgrades.
    pub fn ship_upgrades(&self) -> &ShipUpgrades {
        self.state.group().ship_upgrades.get()
    }

    /// Where the player's ship is.
    pub fn ship_coordinate(&self) -> CelestialCoordinate {
        *self.state.group().ship_coordinate.get()
    }

    /// The client's copy of its ship world.
    pub fn ship_chunks(&self) -> &WorldChunks {
        &self.ship_chunks
    }

    /// Replaces the ship world, queueing the difference for the server.
    pub fn update_ship_chunks(&mut self, chunks: WorldChunks) {
        track_ship_chunks(&mut self.ship_chunks, &mut self.ship_update, chunks);
    }

    /// Queues a call to a server method such as
    /// [`METHOD_APPLY_SHIP_UPGRADES`].
    pub fn invoke_remote(&mut self, method: &str, arguments: Value) -> RpcHandle {
        self.rpc.invoke_remote(method, arguments)
    }

    /// Takes the server's answer to `handle` once it has arrived.
    pub fn rpc_response(&mut self, handle: &RpcHandle) -> Option<Result<Value, RpcError>> {
        self.rpc.response(handle)
    }

    /// Applies a bundle from [`ServerClientContext::write_update`].
    pub fn read_update(&mut self, bytes: &[u8]) -> Result<(), ContextError> {
        let mut reader = ByteReader::new(bytes);
        self.rpc.receive(reader.read_bytes()?, &mut ())?;
        self.state
            .read_net_state(reader.read_bytes()?, 0.0, self.rules)?;
        read_chunks_update(&mut reader, &mut self.ship_chunks)?;
        finish(&reader)
    }

    /// Bundles queued calls and local ship chunk changes.
    pub fn write_update(&mut self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        writer.write_bytes(&self.rpc.send());
        write_chunks_update(&mut writer, &mut self.ship_update);
        writer.into_bytes()
    }
}
