//! The world registry: the room graph, each room's enemy roster, and the
//! roster of connected players.
//!
//! Topology is immutable after [`World::from_yaml`]; everything that mutates
//! at runtime (enemy health/engagement, player room/engagement/health) is
//! reached through this module only.
//!
//! Lock discipline: the client roster lock may be held while taking a room's
//! enemy lock, never the reverse, and no lock is held across a socket write.
//! Engagement setup runs entirely under both locks, so two players going
//! after the same enemy race to exactly one winner.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use anyhow::Context;
use anyhow::bail;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;

use crate::command::Command;
use crate::command::Direction;

pub type ClientId = u64;
pub type RoomId = usize;

const ATTACK_DAMAGE: i32 = 10;
const RETALIATION_DAMAGE: i32 = 5;

const START_HEALTH: i32 = 100;
const START_MANA: i32 = 30;

/// Every fresh character carries the same kit.
const STARTING_KIT: [&str; 2] = ["practice sword", "waterskin"];

/// Non-owning reference to an enemy: room index plus slot in that room's
/// enemy list. Slots are stable because enemies are never removed, only
/// health-reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyRef {
    pub room: RoomId,
    pub slot: usize,
}

#[derive(Debug)]
pub struct Enemy {
    pub name: String,
    pub health: i32,
    pub max_health: i32,
    pub fighting: Option<ClientId>,
}

#[derive(Debug)]
pub struct Room {
    pub name: String,
    pub description: String,
    pub exits: [Option<RoomId>; 4],
    /// The per-room lock: guards the enemy list and every enemy's
    /// engagement field.
    pub enemies: Mutex<Vec<Enemy>>,
}

#[derive(Debug)]
pub struct Client {
    pub name: String,
    pub room: RoomId,
    pub fighting: Option<EnemyRef>,
    pub health: i32,
    pub max_health: i32,
    pub mana: i32,
    pub max_mana: i32,
    pub carried: Vec<String>,
    pub worn: Vec<String>,
    tx: mpsc::Sender<String>,
    kick: watch::Sender<bool>,
}

impl Client {
    /// Queue one outbound message. On overflow the client is kicked rather
    /// than stalling the sender or reordering delivery.
    fn push(&self, msg: String) {
        use tokio::sync::mpsc::error::TrySendError;
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let _ = self.kick.send(true);
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngageError {
    /// The issuer is already in a fight.
    AlreadyFighting,
    /// No living enemy by that name in the room.
    NotFound,
    /// Someone else got there first.
    AlreadyEngaged,
}

impl std::fmt::Display for EngageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngageError::AlreadyFighting => write!(f, "already fighting"),
            EngageError::NotFound => write!(f, "no such enemy"),
            EngageError::AlreadyEngaged => write!(f, "enemy already engaged"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// Engaged players stay put.
    Blocked,
    NoExit,
}

impl std::fmt::Display for MoveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveError::Blocked => write!(f, "blocked by combat"),
            MoveError::NoExit => write!(f, "no exit that way"),
        }
    }
}

pub struct World {
    rooms: Vec<Room>,
    start_room: RoomId,
    // BTreeMap keyed by monotonic id: broadcasts and room listings walk
    // players in join order, deterministically.
    clients: Mutex<BTreeMap<ClientId, Client>>,
    next_client_id: AtomicU64,
}

// ---------------------------------------------------------------------------
// World build

#[derive(Debug, Deserialize)]
struct WorldFile {
    start_room: String,
    rooms: Vec<RoomFile>,
}

#[derive(Debug, Deserialize)]
struct RoomFile {
    id: String,
    name: String,
    desc: String,
    #[serde(default)]
    exits: Vec<ExitFile>,
    #[serde(default)]
    enemies: Vec<EnemyFile>,
}

#[derive(Debug, Deserialize)]
struct ExitFile {
    dir: String,
    to: String,
}

#[derive(Debug, Deserialize)]
struct EnemyFile {
    name: String,
    health: i32,
}

const WORLD_YAML: &str = include_str!("../world/rooms.yaml");

impl World {
    /// Load the compiled-in world file.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_yaml(WORLD_YAML)
    }

    /// Build a world from a YAML description. Any inconsistency (unknown
    /// exit target, duplicate room id or exit direction, non-positive enemy
    /// health, missing start room) is fatal.
    pub fn from_yaml(s: &str) -> anyhow::Result<Self> {
        let wf: WorldFile = serde_yaml::from_str(s).context("parse world yaml")?;
        if wf.rooms.is_empty() {
            bail!("world has no rooms");
        }

        let mut ids: HashMap<String, RoomId> = HashMap::new();
        for (i, r) in wf.rooms.iter().enumerate() {
            if ids.insert(r.id.clone(), i).is_some() {
                bail!("duplicate room id: {}", r.id);
            }
        }
        let start_room = *ids
            .get(&wf.start_room)
            .with_context(|| format!("start room not defined: {}", wf.start_room))?;

        let mut rooms = Vec::with_capacity(wf.rooms.len());
        for r in wf.rooms {
            let mut exits: [Option<RoomId>; 4] = [None; 4];
            for ex in &r.exits {
                let dir = Direction::parse(&ex.dir)
                    .with_context(|| format!("room {}: bad exit direction {:?}", r.id, ex.dir))?;
                let to = *ids
                    .get(&ex.to)
                    .with_context(|| format!("room {}: exit to unknown room {:?}", r.id, ex.to))?;
                if exits[dir.idx()].replace(to).is_some() {
                    bail!("room {}: duplicate exit {}", r.id, dir.as_str());
                }
            }
            let mut enemies = Vec::with_capacity(r.enemies.len());
            for e in &r.enemies {
                if e.health <= 0 {
                    bail!("room {}: enemy {} has non-positive health", r.id, e.name);
                }
                enemies.push(Enemy {
                    name: e.name.clone(),
                    health: e.health,
                    max_health: e.health,
                    fighting: None,
                });
            }
            rooms.push(Room {
                name: r.name,
                description: r.desc,
                exits,
                enemies: Mutex::new(enemies),
            });
        }

        Ok(Self {
            rooms,
            start_room,
            clients: Mutex::new(BTreeMap::new()),
            next_client_id: AtomicU64::new(1),
        })
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

// ---------------------------------------------------------------------------
// Roster

impl World {
    /// Add a freshly handshaken player, placed in the start room. The new
    /// player is visible to broadcasts and to the ticker as soon as the
    /// roster lock is released.
    pub async fn register(
        &self,
        name: String,
        tx: mpsc::Sender<String>,
        kick: watch::Sender<bool>,
    ) -> ClientId {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let client = Client {
            name,
            room: self.start_room,
            fighting: None,
            health: START_HEALTH,
            max_health: START_HEALTH,
            mana: START_MANA,
            max_mana: START_MANA,
            carried: STARTING_KIT.iter().map(|s| s.to_string()).collect(),
            worn: Vec::new(),
            tx,
            kick,
        };
        self.clients.lock().await.insert(id, client);
        id
    }

    /// Remove a player from the roster and release any engagement it held
    /// on both sides. Leaving the enemy marked as fighting a gone player
    /// would strand it alive-and-busy forever, ineligible for respawn.
    pub async fn remove_client(&self, id: ClientId) {
        let mut clients = self.clients.lock().await;
        let Some(client) = clients.remove(&id) else {
            return;
        };
        if let Some(er) = client.fighting {
            let mut enemies = self.rooms[er.room].enemies.lock().await;
            if let Some(enemy) = enemies.get_mut(er.slot) {
                if enemy.fighting == Some(id) {
                    enemy.fighting = None;
                }
            }
        }
    }

    pub async fn player_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Queue a message to one player. Quietly does nothing if the player is
    /// already gone.
    pub async fn send_to(&self, id: ClientId, msg: String) {
        let clients = self.clients.lock().await;
        if let Some(c) = clients.get(&id) {
            c.push(msg);
        }
    }

    /// Queue a message to every player in `room`, except `exclude`.
    pub async fn broadcast_room(&self, room: RoomId, exclude: Option<ClientId>, msg: &str) {
        let clients = self.clients.lock().await;
        for (&id, c) in clients.iter() {
            if c.room == room && Some(id) != exclude {
                c.push(msg.to_string());
            }
        }
    }

    /// Snapshot the stats the outbound flow needs to compose a prompt.
    /// `None` once the player has been deregistered.
    pub async fn prompt_stats(&self, id: ClientId) -> Option<bogtext::PromptStats> {
        let (health, max_health, mana, max_mana, fighting) = {
            let clients = self.clients.lock().await;
            let c = clients.get(&id)?;
            (c.health, c.max_health, c.mana, c.max_mana, c.fighting)
        };
        let enemy_pct = match fighting {
            Some(er) => {
                let enemies = self.rooms[er.room].enemies.lock().await;
                enemies
                    .get(er.slot)
                    .map(|e| (100 * e.health.max(0) / e.max_health) as u32)
            }
            None => None,
        };
        Some(bogtext::PromptStats {
            health,
            max_health,
            mana,
            max_mana,
            enemy_pct,
        })
    }
}

// ---------------------------------------------------------------------------
// Domain operations

impl World {
    /// Start a fight: find a living enemy by exact name in the issuer's
    /// room, check it is free, and pair both sides. The whole sequence runs
    /// under the roster lock plus the room's enemy lock, so of two racing
    /// calls exactly one succeeds.
    pub async fn engage(&self, id: ClientId, target: &str) -> Result<(), EngageError> {
        let mut clients = self.clients.lock().await;
        let client = clients.get_mut(&id).ok_or(EngageError::NotFound)?;
        if client.fighting.is_some() {
            return Err(EngageError::AlreadyFighting);
        }
        let room = client.room;
        let mut enemies = self.rooms[room].enemies.lock().await;
        let slot = enemies
            .iter()
            .position(|e| e.health > 0 && e.name == target)
            .ok_or(EngageError::NotFound)?;
        if enemies[slot].fighting.is_some() {
            return Err(EngageError::AlreadyEngaged);
        }
        enemies[slot].fighting = Some(id);
        client.fighting = Some(EnemyRef { room, slot });
        Ok(())
    }

    /// Walk through an exit. No room lock needed: topology never changes.
    pub async fn move_client(&self, id: ClientId, dir: Direction) -> Result<(), MoveError> {
        let mut clients = self.clients.lock().await;
        let Some(client) = clients.get_mut(&id) else {
            return Ok(());
        };
        if client.fighting.is_some() {
            return Err(MoveError::Blocked);
        }
        let Some(to) = self.rooms[client.room].exits[dir.idx()] else {
            return Err(MoveError::NoExit);
        };
        client.room = to;
        Ok(())
    }

    /// Send the issuer its current room description.
    pub async fn show_room(&self, id: ClientId) {
        let clients = self.clients.lock().await;
        let Some(me) = clients.get(&id) else {
            return;
        };
        let room = &self.rooms[me.room];

        let mut enemy_lines = String::new();
        {
            let enemies = room.enemies.lock().await;
            for e in enemies.iter().filter(|e| e.health > 0) {
                enemy_lines.push_str(&format!("@g@{} is here.@n@\n", e.name));
            }
        }

        let mut player_lines = String::new();
        for (&other, c) in clients.iter() {
            if other != id && c.room == me.room {
                player_lines.push_str(&format!("@y@{} is here.@n@\n", c.name));
            }
        }

        let mut exit_line = String::from("You can go: ");
        for dir in Direction::ALL {
            if room.exits[dir.idx()].is_some() {
                exit_line.push_str(dir.as_str());
                exit_line.push(' ');
            }
        }

        me.push(format!(
            "{}\n\n{}\n{}\n{}\n{}\n",
            room.name, room.description, enemy_lines, player_lines, exit_line
        ));
    }

    async fn say(&self, id: ClientId, text: &str) {
        let clients = self.clients.lock().await;
        let Some(me) = clients.get(&id) else {
            return;
        };
        me.push(format!("You say \"{text}\"\n"));
        for (&other, c) in clients.iter() {
            if other != id && c.room == me.room {
                c.push(format!("{} says \"{text}\"\n", me.name));
            }
        }
    }

    async fn show_inventory(&self, id: ClientId) {
        fn list(items: &[String]) -> String {
            if items.is_empty() {
                "nothing".to_string()
            } else {
                items.join(", ")
            }
        }
        let clients = self.clients.lock().await;
        if let Some(me) = clients.get(&id) {
            me.push(format!(
                "You are carrying: {}\nYou are wearing: {}\n",
                list(&me.carried),
                list(&me.worn)
            ));
        }
    }

    async fn wear(&self, id: ClientId, item: &str) {
        let mut clients = self.clients.lock().await;
        let Some(me) = clients.get_mut(&id) else {
            return;
        };
        match me.carried.iter().position(|x| x == item) {
            Some(i) => {
                let it = me.carried.remove(i);
                me.worn.push(it);
                me.push(format!("You wear {item}.\n"));
            }
            None => me.push(format!("You do not have {item}\n")),
        }
    }

    /// Apply one parsed command on behalf of a player. Every rejection is
    /// one explanatory line back to the issuer and nothing else.
    pub async fn dispatch(&self, id: ClientId, cmd: Command) {
        match cmd {
            Command::Say(text) => self.say(id, &text).await,
            Command::Kill(target) => match self.engage(id, &target).await {
                Ok(()) => {
                    self.send_to(id, format!("You start fighting {target}\n"))
                        .await
                }
                Err(e) => {
                    debug!(id, err = %e, "kill rejected");
                    let line = match e {
                        EngageError::AlreadyFighting => {
                            "Not while you are fighting!\n".to_string()
                        }
                        EngageError::NotFound => format!("You do not see {target}\n"),
                        EngageError::AlreadyEngaged => {
                            format!("{target} is already fighting!\n")
                        }
                    };
                    self.send_to(id, line).await
                }
            },
            Command::Move(dir) => match self.move_client(id, dir).await {
                Ok(()) => self.show_room(id).await,
                Err(e) => {
                    debug!(id, err = %e, "move rejected");
                    let line = match e {
                        MoveError::Blocked => "Not while you are fighting!\n".to_string(),
                        MoveError::NoExit => {
                            format!("There is no exit to the {}.\n", dir.as_str())
                        }
                    };
                    self.send_to(id, line).await
                }
            },
            Command::Look => self.show_room(id).await,
            Command::Inventory => self.show_inventory(id).await,
            Command::Wear(item) => self.wear(id, &item).await,
            Command::Unknown(line) => {
                self.send_to(id, format!("Unknown command {line}\n")).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ticks

impl World {
    /// One combat round: every engaged player trades blows with its enemy.
    /// Deterministic, no misses. A kill clears both sides and skips the
    /// retaliation for that round.
    pub async fn combat_tick(&self) {
        let mut clients = self.clients.lock().await;

        // Group fighters by room so each room's enemy lock is taken once.
        let mut by_room: BTreeMap<RoomId, Vec<ClientId>> = BTreeMap::new();
        for (&id, c) in clients.iter() {
            if let Some(er) = c.fighting {
                by_room.entry(er.room).or_default().push(id);
            }
        }

        for (room, ids) in by_room {
            let mut enemies = self.rooms[room].enemies.lock().await;
            for id in ids {
                let Some(client) = clients.get_mut(&id) else {
                    continue;
                };
                let Some(er) = client.fighting else {
                    continue;
                };
                let Some(enemy) = enemies.get_mut(er.slot) else {
                    continue;
                };
                client.push(format!(
                    "@g@You hit {} for {ATTACK_DAMAGE} damage!@n@\n",
                    enemy.name
                ));
                enemy.health -= ATTACK_DAMAGE;
                if enemy.health <= 0 {
                    debug!(room, enemy = %enemy.name, player = %client.name, "enemy killed");
                    client.push(format!("@G@You kill {}!@n@\n", enemy.name));
                    client.fighting = None;
                    enemy.fighting = None;
                    continue;
                }
                client.push(format!(
                    "@r@{} hits you for {RETALIATION_DAMAGE} damage!@n@\n",
                    enemy.name
                ));
                client.health -= RETALIATION_DAMAGE;
            }
        }
    }

    /// Restore every dead enemy to full health, then tell each room that
    /// saw a respawn about it, once. Dead enemies hold no engagement, so
    /// there is nothing to clear here.
    pub async fn respawn_tick(&self) {
        for (room_id, room) in self.rooms.iter().enumerate() {
            let mut respawned = 0usize;
            {
                let mut enemies = room.enemies.lock().await;
                for e in enemies.iter_mut() {
                    if e.health <= 0 {
                        debug!(room = room_id, enemy = %e.name, "respawning");
                        e.health = e.max_health;
                        respawned += 1;
                    }
                }
            }
            // Room lock released before touching the roster.
            if respawned > 0 {
                self.broadcast_room(room_id, None, "The room has repopped!\n")
                    .await;
            }
        }
    }
}
