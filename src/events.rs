use glam::Vec3;
use rhai::Dynamic;

use crate::entity::EntityKind;

macro_rules! event_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $($variant),+
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name),+
                }
            }

            pub fn from_name(name: &str) -> Option<EventKind> {
                match name {
                    $($name => Some(EventKind::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

event_kinds! {
    BlipCreated => "blip_created",
    BlipDestroyed => "blip_destroyed",
    BlipCustom => "blip_custom",
    CheckpointCreated => "checkpoint_created",
    CheckpointDestroyed => "checkpoint_destroyed",
    CheckpointCustom => "checkpoint_custom",
    CheckpointEntered => "checkpoint_entered",
    CheckpointExited => "checkpoint_exited",
    KeybindCreated => "keybind_created",
    KeybindDestroyed => "keybind_destroyed",
    KeybindCustom => "keybind_custom",
    KeybindKeyPress => "keybind_key_press",
    KeybindKeyRelease => "keybind_key_release",
    ObjectCreated => "object_created",
    ObjectDestroyed => "object_destroyed",
    ObjectCustom => "object_custom",
    ObjectShot => "object_shot",
    ObjectBump => "object_bump",
    PickupCreated => "pickup_created",
    PickupDestroyed => "pickup_destroyed",
    PickupCustom => "pickup_custom",
    PickupRespawn => "pickup_respawn",
    PickupClaimed => "pickup_claimed",
    PickupCollected => "pickup_collected",
    PlayerCreated => "player_created",
    PlayerDestroyed => "player_destroyed",
    PlayerCustom => "player_custom",
    PlayerAway => "player_away",
    PlayerGameKeys => "player_game_keys",
    PlayerRename => "player_rename",
    PlayerRequestClass => "player_request_class",
    PlayerRequestSpawn => "player_request_spawn",
    PlayerSpawn => "player_spawn",
    PlayerStartTyping => "player_start_typing",
    PlayerStopTyping => "player_stop_typing",
    PlayerChat => "player_chat",
    PlayerCommand => "player_command",
    PlayerMessage => "player_message",
    PlayerHealth => "player_health",
    PlayerArmour => "player_armour",
    PlayerWeapon => "player_weapon",
    PlayerMove => "player_move",
    PlayerWasted => "player_wasted",
    PlayerKilled => "player_killed",
    PlayerTeamKill => "player_team_kill",
    PlayerSpectate => "player_spectate",
    PlayerCrashreport => "player_crashreport",
    PlayerBurning => "player_burning",
    PlayerCrouching => "player_crouching",
    PlayerState => "player_state",
    PlayerAction => "player_action",
    StateNone => "state_none",
    StateNormal => "state_normal",
    StateShooting => "state_shooting",
    StateDriver => "state_driver",
    StatePassenger => "state_passenger",
    StateEnterDriver => "state_enter_driver",
    StateEnterPassenger => "state_enter_passenger",
    StateExitVehicle => "state_exit_vehicle",
    StateUnspawned => "state_unspawned",
    ActionNone => "action_none",
    ActionNormal => "action_normal",
    ActionAiming => "action_aiming",
    ActionShooting => "action_shooting",
    ActionJumping => "action_jumping",
    ActionLieDown => "action_lie_down",
    ActionGettingUp => "action_getting_up",
    ActionJumpVehicle => "action_jump_vehicle",
    ActionDriving => "action_driving",
    ActionDying => "action_dying",
    ActionWasted => "action_wasted",
    ActionEmbarking => "action_embarking",
    ActionDisembarking => "action_disembarking",
    SphereCreated => "sphere_created",
    SphereDestroyed => "sphere_destroyed",
    SphereCustom => "sphere_custom",
    SphereEntered => "sphere_entered",
    SphereExited => "sphere_exited",
    SpriteCreated => "sprite_created",
    SpriteDestroyed => "sprite_destroyed",
    SpriteCustom => "sprite_custom",
    TextdrawCreated => "textdraw_created",
    TextdrawDestroyed => "textdraw_destroyed",
    TextdrawCustom => "textdraw_custom",
    VehicleCreated => "vehicle_created",
    VehicleDestroyed => "vehicle_destroyed",
    VehicleCustom => "vehicle_custom",
    VehicleRespawn => "vehicle_respawn",
    VehicleExplode => "vehicle_explode",
    VehicleHealth => "vehicle_health",
    VehicleMove => "vehicle_move",
    VehicleEmbarking => "vehicle_embarking",
    VehicleEmbarked => "vehicle_embarked",
    VehicleDisembark => "vehicle_disembark",
    ServerFrame => "server_frame",
    ServerStartup => "server_startup",
    ServerShutdown => "server_shutdown",
    InternalCommand => "internal_command",
    LoginAttempt => "login_attempt",
    CustomEvent => "custom_event",
    WorldOption => "world_option",
    WorldToggle => "world_toggle",
    ScriptReload => "script_reload",
    LogMessage => "log_message",
}

pub fn created_for(kind: EntityKind) -> EventKind {
    match kind {
        EntityKind::Blip => EventKind::BlipCreated,
        EntityKind::Checkpoint => EventKind::CheckpointCreated,
        EntityKind::Keybind => EventKind::KeybindCreated,
        EntityKind::Object => EventKind::ObjectCreated,
        EntityKind::Pickup => EventKind::PickupCreated,
        EntityKind::Player => EventKind::PlayerCreated,
        EntityKind::Sphere => EventKind::SphereCreated,
        EntityKind::Sprite => EventKind::SpriteCreated,
        EntityKind::Textdraw => EventKind::TextdrawCreated,
        EntityKind::Vehicle => EventKind::VehicleCreated,
    }
}

pub fn destroyed_for(kind: EntityKind) -> EventKind {
    match kind {
        EntityKind::Blip => EventKind::BlipDestroyed,
        EntityKind::Checkpoint => EventKind::CheckpointDestroyed,
        EntityKind::Keybind => EventKind::KeybindDestroyed,
        EntityKind::Object => EventKind::ObjectDestroyed,
        EntityKind::Pickup => EventKind::PickupDestroyed,
        EntityKind::Player => EventKind::PlayerDestroyed,
        EntityKind::Sphere => EventKind::SphereDestroyed,
        EntityKind::Sprite => EventKind::SpriteDestroyed,
        EntityKind::Textdraw => EventKind::TextdrawDestroyed,
        EntityKind::Vehicle => EventKind::VehicleDestroyed,
    }
}

pub fn custom_for(kind: EntityKind) -> EventKind {
    match kind {
        EntityKind::Blip => EventKind::BlipCustom,
        EntityKind::Checkpoint => EventKind::CheckpointCustom,
        EntityKind::Keybind => EventKind::KeybindCustom,
        EntityKind::Object => EventKind::ObjectCustom,
        EntityKind::Pickup => EventKind::PickupCustom,
        EntityKind::Player => EventKind::PlayerCustom,
        EntityKind::Sphere => EventKind::SphereCustom,
        EntityKind::Sprite => EventKind::SpriteCustom,
        EntityKind::Textdraw => EventKind::TextdrawCustom,
        EntityKind::Vehicle => EventKind::VehicleCustom,
    }
}

impl EventKind {
    /// The entity kind this event belongs to, if it is an entity event at all.
    pub fn owner_kind(self) -> Option<EntityKind> {
        use EventKind::*;
        match self {
            BlipCreated | BlipDestroyed | BlipCustom => Some(EntityKind::Blip),
            CheckpointCreated | CheckpointDestroyed | CheckpointCustom | CheckpointEntered
            | CheckpointExited => Some(EntityKind::Checkpoint),
            KeybindCreated | KeybindDestroyed | KeybindCustom | KeybindKeyPress
            | KeybindKeyRelease => Some(EntityKind::Keybind),
            ObjectCreated | ObjectDestroyed | ObjectCustom | ObjectShot | ObjectBump => {
                Some(EntityKind::Object)
            }
            PickupCreated | PickupDestroyed | PickupCustom | PickupRespawn | PickupClaimed
            | PickupCollected => Some(EntityKind::Pickup),
            PlayerCreated | PlayerDestroyed | PlayerCustom | PlayerAway | PlayerGameKeys
            | PlayerRename | PlayerRequestClass | PlayerRequestSpawn | PlayerSpawn
            | PlayerStartTyping | PlayerStopTyping | PlayerChat | PlayerCommand
            | PlayerMessage | PlayerHealth | PlayerArmour | PlayerWeapon | PlayerMove
            | PlayerWasted | PlayerKilled | PlayerTeamKill | PlayerSpectate
            | PlayerCrashreport | PlayerBurning | PlayerCrouching | PlayerState
            | PlayerAction | StateNone | StateNormal | StateShooting | StateDriver
            | StatePassenger | StateEnterDriver | StateEnterPassenger | StateExitVehicle
            | StateUnspawned | ActionNone | ActionNormal | ActionAiming | ActionShooting
            | ActionJumping | ActionLieDown | ActionGettingUp | ActionJumpVehicle
            | ActionDriving | ActionDying | ActionWasted | ActionEmbarking
            | ActionDisembarking => Some(EntityKind::Player),
            SphereCreated | SphereDestroyed | SphereCustom | SphereEntered | SphereExited => {
                Some(EntityKind::Sphere)
            }
            SpriteCreated | SpriteDestroyed | SpriteCustom => Some(EntityKind::Sprite),
            TextdrawCreated | TextdrawDestroyed | TextdrawCustom => Some(EntityKind::Textdraw),
            VehicleCreated | VehicleDestroyed | VehicleCustom | VehicleRespawn
            | VehicleExplode | VehicleHealth | VehicleMove | VehicleEmbarking
            | VehicleEmbarked | VehicleDisembark => Some(EntityKind::Vehicle),
            ServerFrame | ServerStartup | ServerShutdown | InternalCommand | LoginAttempt
            | CustomEvent | WorldOption | WorldToggle | ScriptReload | LogMessage => None,
        }
    }

    pub fn is_entity_event(self) -> bool {
        self.owner_kind().is_some()
    }
}

/// One raised event's payload. Shapes are shared between event kinds with the
/// same native callback signature.
#[derive(Debug, Clone)]
pub enum EventArgs {
    /// Created/destroyed/custom notifications of any entity kind.
    Instance { id: i32, header: i32, payload: Dynamic },
    Player { player: i32 },
    PlayerFlag { player: i32, state: bool },
    PlayerOffset { player: i32, offset: i32 },
    PlayerText { player: i32, text: String },
    PlayerMessage { player: i32, receiver: i32, text: String },
    PlayerRename { player: i32, previous: String, current: String },
    PlayerTransition { player: i32, previous: i32, current: i32 },
    PlayerGauge { player: i32, previous: f32, current: f32 },
    PlayerMove { player: i32, previous: Vec3, current: Vec3 },
    PlayerWasted { player: i32, reason: i32 },
    PlayerKilled { player: i32, killer: i32, reason: i32, body_part: i32 },
    PlayerSpectate { player: i32, target: i32 },
    /// State/action specific transitions carry only the previous value.
    PlayerPrevious { player: i32, previous: i32 },
    PlayerKeybind { player: i32, keybind: i32 },
    PlayerVehicle { player: i32, vehicle: i32, slot: i32 },
    PlayerVehicleExit { player: i32, vehicle: i32 },
    PlayerPickup { player: i32, pickup: i32 },
    PlayerObjectShot { player: i32, object: i32, weapon: i32 },
    PlayerObject { player: i32, object: i32 },
    PlayerCheckpoint { player: i32, checkpoint: i32 },
    PlayerSphere { player: i32, sphere: i32 },
    Vehicle { vehicle: i32 },
    VehicleGauge { vehicle: i32, previous: f32, current: f32 },
    VehicleMove { vehicle: i32, previous: Vec3, current: Vec3 },
    Pickup { pickup: i32 },
    Frame { delta: f32 },
    Command { kind: i32, text: String },
    Login { name: String, password: String, address: String },
    Custom { group: i32, header: i32, payload: Dynamic },
    WorldOption { option: i32, value: Dynamic },
    Toggle { option: i32, value: bool },
    Log { level: i32, message: String },
    Reload { header: i32, payload: Dynamic },
    None,
}

pub type Participant = (EntityKind, i32);

impl EventArgs {
    /// Resolve the entities involved in a raise: the subject the event belongs
    /// to, and the incidental participant of paired events. `event` is needed
    /// because instance notifications share one shape across all kinds.
    pub fn participants(&self, event: EventKind) -> (Option<Participant>, Option<Participant>) {
        use EventArgs::*;
        match *self {
            Instance { id, .. } => (event.owner_kind().map(|k| (k, id)), Option::None),
            Player { player }
            | PlayerFlag { player, .. }
            | PlayerOffset { player, .. }
            | PlayerText { player, .. }
            | PlayerMessage { player, .. }
            | PlayerRename { player, .. }
            | PlayerTransition { player, .. }
            | PlayerGauge { player, .. }
            | PlayerMove { player, .. }
            | PlayerWasted { player, .. }
            | PlayerKilled { player, .. }
            | PlayerSpectate { player, .. }
            | PlayerPrevious { player, .. } => {
                (Some((EntityKind::Player, player)), Option::None)
            }
            PlayerKeybind { player, keybind } => {
                (Some((EntityKind::Keybind, keybind)), Some((EntityKind::Player, player)))
            }
            PlayerVehicle { player, vehicle, .. } | PlayerVehicleExit { player, vehicle } => {
                (Some((EntityKind::Vehicle, vehicle)), Some((EntityKind::Player, player)))
            }
            PlayerPickup { player, pickup } => {
                (Some((EntityKind::Pickup, pickup)), Some((EntityKind::Player, player)))
            }
            PlayerObjectShot { player, object, .. } | PlayerObject { player, object } => {
                (Some((EntityKind::Object, object)), Some((EntityKind::Player, player)))
            }
            PlayerCheckpoint { player, checkpoint } => {
                (Some((EntityKind::Checkpoint, checkpoint)), Some((EntityKind::Player, player)))
            }
            PlayerSphere { player, sphere } => {
                (Some((EntityKind::Sphere, sphere)), Some((EntityKind::Player, player)))
            }
            Vehicle { vehicle } | VehicleGauge { vehicle, .. } | VehicleMove { vehicle, .. } => {
                (Some((EntityKind::Vehicle, vehicle)), Option::None)
            }
            Pickup { pickup } => (Some((EntityKind::Pickup, pickup)), Option::None),
            Frame { .. } | Command { .. } | Login { .. } | Custom { .. } | WorldOption { .. }
            | Toggle { .. } | Log { .. } | Reload { .. } | None => (Option::None, Option::None),
        }
    }

    /// Flatten into the argument list forwarded to script listeners, in the
    /// native callback order.
    pub fn to_script_args(&self) -> Vec<Dynamic> {
        use EventArgs::*;
        match self {
            Instance { id, header, payload } => vec![int(*id), int(*header), payload.clone()],
            Player { player } => vec![int(*player)],
            PlayerFlag { player, state } => vec![int(*player), Dynamic::from(*state)],
            PlayerOffset { player, offset } => vec![int(*player), int(*offset)],
            PlayerText { player, text } => vec![int(*player), Dynamic::from(text.clone())],
            PlayerMessage { player, receiver, text } => {
                vec![int(*player), int(*receiver), Dynamic::from(text.clone())]
            }
            PlayerRename { player, previous, current } => vec![
                int(*player),
                Dynamic::from(previous.clone()),
                Dynamic::from(current.clone()),
            ],
            PlayerTransition { player, previous, current } => {
                vec![int(*player), int(*previous), int(*current)]
            }
            PlayerGauge { player, previous, current } => {
                vec![int(*player), float(*previous), float(*current)]
            }
            PlayerMove { player, previous, current } => {
                vec![int(*player), vector(*previous), vector(*current)]
            }
            PlayerWasted { player, reason } => vec![int(*player), int(*reason)],
            PlayerKilled { player, killer, reason, body_part } => {
                vec![int(*player), int(*killer), int(*reason), int(*body_part)]
            }
            PlayerSpectate { player, target } => vec![int(*player), int(*target)],
            PlayerPrevious { player, previous } => vec![int(*player), int(*previous)],
            PlayerKeybind { player, keybind } => vec![int(*player), int(*keybind)],
            PlayerVehicle { player, vehicle, slot } => {
                vec![int(*player), int(*vehicle), int(*slot)]
            }
            PlayerVehicleExit { player, vehicle } => vec![int(*player), int(*vehicle)],
            PlayerPickup { player, pickup } => vec![int(*player), int(*pickup)],
            PlayerObjectShot { player, object, weapon } => {
                vec![int(*player), int(*object), int(*weapon)]
            }
            PlayerObject { player, object } => vec![int(*player), int(*object)],
            PlayerCheckpoint { player, checkpoint } => vec![int(*player), int(*checkpoint)],
            PlayerSphere { player, sphere } => vec![int(*player), int(*sphere)],
            Vehicle { vehicle } => vec![int(*vehicle)],
            VehicleGauge { vehicle, previous, current } => {
                vec![int(*vehicle), float(*previous), float(*current)]
            }
            VehicleMove { vehicle, previous, current } => {
                vec![int(*vehicle), vector(*previous), vector(*current)]
            }
            Pickup { pickup } => vec![int(*pickup)],
            Frame { delta } => vec![float(*delta)],
            Command { kind, text } => vec![int(*kind), Dynamic::from(text.clone())],
            Login { name, password, address } => vec![
                Dynamic::from(name.clone()),
                Dynamic::from(password.clone()),
                Dynamic::from(address.clone()),
            ],
            Custom { group, header, payload } => vec![int(*group), int(*header), payload.clone()],
            WorldOption { option, value } => vec![int(*option), value.clone()],
            Toggle { option, value } => vec![int(*option), Dynamic::from(*value)],
            Log { level, message } => vec![int(*level), Dynamic::from(message.clone())],
            Reload { header, payload } => vec![int(*header), payload.clone()],
            None => Vec::new(),
        }
    }
}

fn int(value: i32) -> Dynamic {
    Dynamic::from(value as i64)
}

fn float(value: f32) -> Dynamic {
    Dynamic::from(value as f64)
}

fn vector(value: Vec3) -> Dynamic {
    Dynamic::from_array(vec![float(value.x), float(value.y), float(value.z)])
}
