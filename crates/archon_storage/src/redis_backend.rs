//! Redis backend.
//!
//! Each `(component, archetype)` table is one Redis list in slot order, so a
//! list index is a slot index. Redis lists cannot delete at an index, so every
//! compacting mutation runs as a Lua script: the list and its `CIDX` key change
//! together or not at all.

use std::sync::{Arc, LazyLock};

use archon_component::{ArchetypeId, ComponentTypeId, Entity, EntityId, SlotIndex, codec};
use redis::Commands;
use tracing::trace;

use crate::connection::RedisConnection;
use crate::error::StorageError;
use crate::keys;
use crate::store::{
    ComponentIndexStore, ComponentOp, ComponentStore, Entry, EntityManager, EntryStore, Location,
    LocationStore, StateKey, StateStore,
};

// ── Scripts ─────────────────────────────────────────────────────────────────

/// KEYS: data, cidx. ARGV: bytes. Returns the new slot.
const PUSH_SRC: &str = r"
local len = redis.call('RPUSH', KEYS[1], ARGV[1])
redis.call('SET', KEYS[2], len - 1)
return len - 1
";

/// KEYS: data. ARGV: slot, bytes. Returns nil when the slot is empty.
const SET_SRC: &str = r"
local slot = tonumber(ARGV[1])
if slot >= redis.call('LLEN', KEYS[1]) then
  return false
end
redis.call('LSET', KEYS[1], slot, ARGV[2])
return 1
";

/// KEYS: data, cidx. ARGV: slot. Returns the removed bytes, or nil when the
/// slot is empty.
const SWAP_REMOVE_SRC: &str = r"
local slot = tonumber(ARGV[1])
local len = redis.call('LLEN', KEYS[1])
if slot >= len then
  return false
end
local removed = redis.call('LINDEX', KEYS[1], slot)
local last = redis.call('RPOP', KEYS[1])
if slot < len - 1 then
  redis.call('LSET', KEYS[1], slot, last)
end
if len > 1 then
  redis.call('SET', KEYS[2], len - 2)
else
  redis.call('DEL', KEYS[2])
end
return removed
";

/// KEYS: src data, src cidx, dst data, dst cidx. ARGV: slot. Returns the
/// slot in the destination, or nil when the source slot is empty.
const MOVE_SRC: &str = r"
local slot = tonumber(ARGV[1])
local len = redis.call('LLEN', KEYS[1])
if slot >= len then
  return false
end
local moved = redis.call('LINDEX', KEYS[1], slot)
local last = redis.call('RPOP', KEYS[1])
if slot < len - 1 then
  redis.call('LSET', KEYS[1], slot, last)
end
if len > 1 then
  redis.call('SET', KEYS[2], len - 2)
else
  redis.call('DEL', KEYS[2])
end
local dst_len = redis.call('RPUSH', KEYS[3], moved)
redis.call('SET', KEYS[4], dst_len - 1)
return dst_len - 1
";

/// KEYS: free list, next id. Returns `{kind, value}`.
const ALLOCATE_SRC: &str = r"
local recycled = redis.call('RPOP', KEYS[1])
if recycled then
  return {'recycled', recycled}
end
return {'fresh', tostring(redis.call('INCR', KEYS[2]))}
";

static PUSH: LazyLock<redis::Script> = LazyLock::new(|| redis::Script::new(PUSH_SRC));
static SET: LazyLock<redis::Script> = LazyLock::new(|| redis::Script::new(SET_SRC));
static SWAP_REMOVE: LazyLock<redis::Script> =
    LazyLock::new(|| redis::Script::new(SWAP_REMOVE_SRC));
static MOVE: LazyLock<redis::Script> = LazyLock::new(|| redis::Script::new(MOVE_SRC));
static ALLOCATE: LazyLock<redis::Script> = LazyLock::new(|| redis::Script::new(ALLOCATE_SRC));

// ── Components ──────────────────────────────────────────────────────────────

/// Component tables as Redis lists.
#[derive(Debug, Clone)]
pub struct RedisComponentStore {
    conn: Arc<RedisConnection>,
}

impl RedisComponentStore {
    /// Creates a store over a shared connection.
    #[must_use]
    pub fn new(conn: Arc<RedisConnection>) -> Self {
        Self { conn }
    }

    fn data_key(&self, component: ComponentTypeId, archetype: ArchetypeId) -> String {
        keys::component_data(self.conn.namespace(), component, archetype)
    }

    fn slot_key(&self, component: ComponentTypeId, archetype: ArchetypeId) -> String {
        keys::component_slot(self.conn.namespace(), component, archetype)
    }

    fn apply_one(&mut self, op: &ComponentOp) -> Result<(), StorageError> {
        match op {
            ComponentOp::Push {
                component,
                archetype,
                bytes,
            } => self.push_component(*component, *archetype, bytes).map(|_| ()),
            ComponentOp::Move {
                component,
                from,
                slot,
                to,
            } => self.move_component(*component, *from, *slot, *to).map(|_| ()),
            ComponentOp::SwapRemove {
                component,
                archetype,
                slot,
            } => self.swap_remove(*component, *archetype, *slot).map(|_| ()),
        }
    }

    /// The op as a raw `EVAL`, for queuing inside `MULTI`.
    fn eval_cmd(&self, op: &ComponentOp) -> redis::Cmd {
        let mut cmd = redis::cmd("EVAL");
        match op {
            ComponentOp::Push {
                component,
                archetype,
                bytes,
            } => {
                cmd.arg(PUSH_SRC)
                    .arg(2)
                    .arg(self.data_key(*component, *archetype))
                    .arg(self.slot_key(*component, *archetype))
                    .arg(bytes.as_slice());
            }
            ComponentOp::Move {
                component,
                from,
                slot,
                to,
            } => {
                cmd.arg(MOVE_SRC)
                    .arg(4)
                    .arg(self.data_key(*component, *from))
                    .arg(self.slot_key(*component, *from))
                    .arg(self.data_key(*component, *to))
                    .arg(self.slot_key(*component, *to))
                    .arg(*slot);
            }
            ComponentOp::SwapRemove {
                component,
                archetype,
                slot,
            } => {
                cmd.arg(SWAP_REMOVE_SRC)
                    .arg(2)
                    .arg(self.data_key(*component, *archetype))
                    .arg(self.slot_key(*component, *archetype))
                    .arg(*slot);
            }
        }
        cmd
    }
}

fn out_of_range(op: &ComponentOp) -> StorageError {
    match *op {
        ComponentOp::Push {
            component,
            archetype,
            ..
        } => StorageError::UnexpectedReply(format!(
            "push to component {component} archetype {archetype} returned nil"
        )),
        ComponentOp::Move {
            component,
            from,
            slot,
            ..
        } => StorageError::SlotOutOfRange {
            component,
            archetype: from,
            slot,
        },
        ComponentOp::SwapRemove {
            component,
            archetype,
            slot,
        } => StorageError::SlotOutOfRange {
            component,
            archetype,
            slot,
        },
    }
}

impl ComponentStore for RedisComponentStore {
    fn push_component(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        bytes: &[u8],
    ) -> Result<SlotIndex, StorageError> {
        let data = self.data_key(component, archetype);
        let slot = self.slot_key(component, archetype);
        self.conn
            .with(|c| PUSH.key(data).key(slot).arg(bytes).invoke::<SlotIndex>(c))
    }

    fn component(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<Vec<u8>, StorageError> {
        let data = self.data_key(component, archetype);
        let index = isize::try_from(slot).map_err(|_| StorageError::SlotOutOfRange {
            component,
            archetype,
            slot,
        })?;
        self.conn
            .with(|c| c.lindex::<_, Option<Vec<u8>>>(data, index))?
            .ok_or(StorageError::SlotOutOfRange {
                component,
                archetype,
                slot,
            })
    }

    fn set_component(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
        bytes: &[u8],
    ) -> Result<(), StorageError> {
        let data = self.data_key(component, archetype);
        self.conn
            .with(|c| SET.key(data).arg(slot).arg(bytes).invoke::<Option<i64>>(c))?
            .map(|_| ())
            .ok_or(StorageError::SlotOutOfRange {
                component,
                archetype,
                slot,
            })
    }

    fn move_component(
        &mut self,
        component: ComponentTypeId,
        from: ArchetypeId,
        slot: SlotIndex,
        to: ArchetypeId,
    ) -> Result<SlotIndex, StorageError> {
        let move_keys = [
            self.data_key(component, from),
            self.slot_key(component, from),
            self.data_key(component, to),
            self.slot_key(component, to),
        ];
        self.conn
            .with(|c| MOVE.key(&move_keys[..]).arg(slot).invoke::<Option<SlotIndex>>(c))?
            .ok_or(StorageError::SlotOutOfRange {
                component,
                archetype: from,
                slot,
            })
    }

    fn swap_remove(
        &mut self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<Vec<u8>, StorageError> {
        let data = self.data_key(component, archetype);
        let cidx = self.slot_key(component, archetype);
        self.conn
            .with(|c| {
                SWAP_REMOVE
                    .key(data)
                    .key(cidx)
                    .arg(slot)
                    .invoke::<Option<Vec<u8>>>(c)
            })?
            .ok_or(StorageError::SlotOutOfRange {
                component,
                archetype,
                slot,
            })
    }

    fn contains(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<bool, StorageError> {
        Ok(slot < self.len(component, archetype)?)
    }

    fn len(
        &self,
        component: ComponentTypeId,
        archetype: ArchetypeId,
    ) -> Result<usize, StorageError> {
        let data = self.data_key(component, archetype);
        self.conn.with(|c| c.llen::<_, usize>(data))
    }

    /// With pipelining on, every op is queued as an `EVAL` inside one
    /// `MULTI`/`EXEC`, so the batch costs a single round trip and no other
    /// client observes it half-applied.
    fn apply(&mut self, ops: &[ComponentOp]) -> Result<(), StorageError> {
        if ops.is_empty() {
            return Ok(());
        }
        if !self.conn.pipelined() {
            return ops.iter().try_for_each(|op| self.apply_one(op));
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in ops {
            pipe.add_command(self.eval_cmd(op));
        }
        let replies: Vec<redis::Value> = self.conn.with(|c| pipe.query(c))?;
        trace!(ops = ops.len(), "applied component batch");
        if replies.len() != ops.len() {
            return Err(StorageError::UnexpectedReply(format!(
                "expected {} replies, got {}",
                ops.len(),
                replies.len()
            )));
        }
        match ops
            .iter()
            .zip(&replies)
            .find(|(_, reply)| matches!(reply, redis::Value::Nil))
        {
            Some((op, _)) => Err(out_of_range(op)),
            None => Ok(()),
        }
    }
}

/// Per-archetype slot counters as `CIDX:WORLD-{W}:A-{A}` integers.
#[derive(Debug, Clone)]
pub struct RedisComponentIndex {
    conn: Arc<RedisConnection>,
}

impl RedisComponentIndex {
    /// Creates an index over a shared connection.
    #[must_use]
    pub fn new(conn: Arc<RedisConnection>) -> Self {
        Self { conn }
    }
}

impl ComponentIndexStore for RedisComponentIndex {
    fn count(&self, archetype: ArchetypeId) -> Result<usize, StorageError> {
        let key = keys::archetype_slots(self.conn.namespace(), archetype);
        Ok(self
            .conn
            .with(|c| c.get::<_, Option<usize>>(key))?
            .unwrap_or(0))
    }

    fn increment(&mut self, archetype: ArchetypeId) -> Result<SlotIndex, StorageError> {
        let key = keys::archetype_slots(self.conn.namespace(), archetype);
        let count = self.conn.with(|c| c.incr::<_, _, i64>(key, 1))?;
        usize::try_from(count - 1)
            .map_err(|_| StorageError::UnexpectedReply(format!("slot counter at {count}")))
    }

    fn decrement(&mut self, archetype: ArchetypeId) -> Result<(), StorageError> {
        let key = keys::archetype_slots(self.conn.namespace(), archetype);
        self.conn.with(|c| c.decr::<_, _, ()>(key, 1))
    }
}

// ── Entities ────────────────────────────────────────────────────────────────

/// One `LOC:` key per entity id plus the `LOCL:` live counter.
#[derive(Debug, Clone)]
pub struct RedisLocationStore {
    conn: Arc<RedisConnection>,
}

impl RedisLocationStore {
    /// Creates a store over a shared connection.
    #[must_use]
    pub fn new(conn: Arc<RedisConnection>) -> Self {
        Self { conn }
    }

    fn write(&self, id: EntityId, location: Location, count_delta: i64) -> Result<(), StorageError> {
        let key = keys::location(self.conn.namespace(), id);
        let count_key = keys::location_count(self.conn.namespace());
        let bytes = codec::encode(&location)?;
        self.conn.with(|c| {
            let mut pipe = redis::pipe();
            pipe.atomic().set(key, bytes).ignore();
            if count_delta != 0 {
                pipe.incr(count_key, count_delta).ignore();
            }
            pipe.query::<()>(c)
        })
    }
}

impl LocationStore for RedisLocationStore {
    fn insert(
        &mut self,
        id: EntityId,
        archetype: ArchetypeId,
        slot: SlotIndex,
    ) -> Result<(), StorageError> {
        let was_live = self.contains_entity(id)?;
        self.write(id, Location::new(archetype, slot), if was_live { 0 } else { 1 })
    }

    fn set(&mut self, id: EntityId, location: Location) -> Result<(), StorageError> {
        self.write(id, location, 0)
    }

    // Always one MULTI/EXEC, pipelining or not: a location commit that lands
    // halfway leaves two entities claiming one slot.
    fn commit(
        &mut self,
        updates: &[(EntityId, Location)],
        live_delta: i64,
    ) -> Result<(), StorageError> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (id, location) in updates {
            let key = keys::location(self.conn.namespace(), *id);
            pipe.set(key, codec::encode(location)?).ignore();
        }
        if live_delta != 0 {
            pipe.incr(keys::location_count(self.conn.namespace()), live_delta)
                .ignore();
        }
        self.conn.with(|c| pipe.query::<()>(c))
    }

    fn location(&self, id: EntityId) -> Result<Option<Location>, StorageError> {
        let key = keys::location(self.conn.namespace(), id);
        let bytes = self.conn.with(|c| c.get::<_, Option<Vec<u8>>>(key))?;
        Ok(bytes.map(|b| codec::decode(&b)).transpose()?)
    }

    fn remove(&mut self, id: EntityId) -> Result<(), StorageError> {
        let mut location = self.location(id)?.ok_or(StorageError::MissingLocation(id))?;
        if !location.valid {
            return Ok(());
        }
        location.valid = false;
        self.write(id, location, -1)
    }

    fn len(&self) -> Result<usize, StorageError> {
        let key = keys::location_count(self.conn.namespace());
        Ok(self
            .conn
            .with(|c| c.get::<_, Option<usize>>(key))?
            .unwrap_or(0))
    }
}

/// One `ENTRY:` key per entity id.
#[derive(Debug, Clone)]
pub struct RedisEntryStore {
    conn: Arc<RedisConnection>,
}

impl RedisEntryStore {
    /// Creates a store over a shared connection.
    #[must_use]
    pub fn new(conn: Arc<RedisConnection>) -> Self {
        Self { conn }
    }
}

impl EntryStore for RedisEntryStore {
    fn set_entry(&mut self, entry: &Entry) -> Result<(), StorageError> {
        let key = keys::entry(self.conn.namespace(), entry.id);
        let bytes = codec::encode(entry)?;
        self.conn.with(|c| c.set::<_, _, ()>(key, bytes))
    }

    fn set_entries(&mut self, entries: &[Entry]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        if !self.conn.pipelined() {
            for entry in entries {
                self.set_entry(entry)?;
            }
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for entry in entries {
            let key = keys::entry(self.conn.namespace(), entry.id);
            pipe.set(key, codec::encode(entry)?).ignore();
        }
        self.conn.with(|c| pipe.query::<()>(c))
    }

    fn entry(&self, id: EntityId) -> Result<Option<Entry>, StorageError> {
        let key = keys::entry(self.conn.namespace(), id);
        let bytes = self.conn.with(|c| c.get::<_, Option<Vec<u8>>>(key))?;
        Ok(bytes.map(|b| codec::decode(&b)).transpose()?)
    }

    fn remove_entry(&mut self, id: EntityId) -> Result<(), StorageError> {
        let key = keys::entry(self.conn.namespace(), id);
        self.conn.with(|c| c.del::<_, ()>(key))
    }
}

/// `NEXTID` counter plus a `FREE` list of version-bumped handles.
#[derive(Debug, Clone)]
pub struct RedisEntityManager {
    conn: Arc<RedisConnection>,
}

impl RedisEntityManager {
    /// Creates a manager over a shared connection.
    #[must_use]
    pub fn new(conn: Arc<RedisConnection>) -> Self {
        Self { conn }
    }
}

impl EntityManager for RedisEntityManager {
    fn new_entity(&mut self) -> Result<Entity, StorageError> {
        let free = keys::free_entities(self.conn.namespace());
        let next = keys::next_entity_id(self.conn.namespace());
        let (kind, value): (String, String) = self
            .conn
            .with(|c| ALLOCATE.key(free).key(next).invoke(c))?;
        let bad_reply = || StorageError::UnexpectedReply(format!("allocate returned {kind} {value}"));
        match kind.as_str() {
            "recycled" => value.parse::<u64>().map(Entity::from_raw).map_err(|_| bad_reply()),
            "fresh" => value
                .parse::<EntityId>()
                .map(|id| Entity::new(id, 0))
                .map_err(|_| bad_reply()),
            _ => Err(bad_reply()),
        }
    }

    fn destroy(&mut self, next: Entity) -> Result<(), StorageError> {
        let free = keys::free_entities(self.conn.namespace());
        self.conn.with(|c| c.rpush::<_, _, ()>(free, next.to_raw()))
    }
}

/// `ARCH:` and `SCHEMA:` blobs.
#[derive(Debug, Clone)]
pub struct RedisStateStore {
    conn: Arc<RedisConnection>,
}

impl RedisStateStore {
    /// Creates a store over a shared connection.
    #[must_use]
    pub fn new(conn: Arc<RedisConnection>) -> Self {
        Self { conn }
    }

    fn key(&self, key: StateKey) -> String {
        match key {
            StateKey::Archetypes => keys::archetypes(self.conn.namespace()),
            StateKey::Schema => keys::schema(self.conn.namespace()),
        }
    }
}

impl StateStore for RedisStateStore {
    fn save(&mut self, key: StateKey, bytes: &[u8]) -> Result<(), StorageError> {
        let key = self.key(key);
        self.conn.with(|c| c.set::<_, _, ()>(key, bytes))
    }

    fn load(&self, key: StateKey) -> Result<Option<Vec<u8>>, StorageError> {
        let key = self.key(key);
        self.conn.with(|c| c.get::<_, Option<Vec<u8>>>(key))
    }
}
