use bitflags::bitflags;
use glam::Vec3;

use crate::events::EventKind;

/// The closed set of entity kinds the server exposes to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Blip,
    Checkpoint,
    Keybind,
    Object,
    Pickup,
    Player,
    Sphere,
    Sprite,
    Textdraw,
    Vehicle,
}

pub const KIND_COUNT: usize = 10;

impl EntityKind {
    pub const ALL: [EntityKind; KIND_COUNT] = [
        EntityKind::Blip,
        EntityKind::Checkpoint,
        EntityKind::Keybind,
        EntityKind::Object,
        EntityKind::Pickup,
        EntityKind::Player,
        EntityKind::Sphere,
        EntityKind::Sprite,
        EntityKind::Textdraw,
        EntityKind::Vehicle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Blip => "blip",
            EntityKind::Checkpoint => "checkpoint",
            EntityKind::Keybind => "keybind",
            EntityKind::Object => "object",
            EntityKind::Pickup => "pickup",
            EntityKind::Player => "player",
            EntityKind::Sphere => "sphere",
            EntityKind::Sprite => "sprite",
            EntityKind::Textdraw => "textdraw",
            EntityKind::Vehicle => "vehicle",
        }
    }

    pub fn index(self) -> usize {
        match self {
            EntityKind::Blip => 0,
            EntityKind::Checkpoint => 1,
            EntityKind::Keybind => 2,
            EntityKind::Object => 3,
            EntityKind::Pickup => 4,
            EntityKind::Player => 5,
            EntityKind::Sphere => 6,
            EntityKind::Sprite => 7,
            EntityKind::Textdraw => 8,
            EntityKind::Vehicle => 9,
        }
    }

    pub const fn default_limit(self) -> usize {
        match self {
            EntityKind::Blip => 128,
            EntityKind::Checkpoint => 2000,
            EntityKind::Keybind => 256,
            EntityKind::Object => 3000,
            EntityKind::Pickup => 2000,
            EntityKind::Player => 100,
            EntityKind::Sphere => 2000,
            EntityKind::Sprite => 128,
            EntityKind::Textdraw => 256,
            EntityKind::Vehicle => 1000,
        }
    }

    /// Role-selecting membership test. With `inversed` false this answers
    /// whether the kind is the subject an event of this type belongs to; with
    /// `inversed` true, whether the kind shows up as the incidental participant
    /// of a paired event (the player entering a checkpoint, embarking a
    /// vehicle, claiming a pickup and so on).
    pub fn in_event_for(self, event: EventKind, inversed: bool) -> bool {
        use EventKind::*;
        match self {
            EntityKind::Blip => matches!(event, BlipCreated | BlipDestroyed | BlipCustom),
            EntityKind::Checkpoint => match event {
                CheckpointCreated | CheckpointDestroyed | CheckpointCustom => true,
                CheckpointEntered | CheckpointExited => !inversed,
                _ => false,
            },
            EntityKind::Keybind => match event {
                KeybindCreated | KeybindDestroyed | KeybindCustom => true,
                KeybindKeyPress | KeybindKeyRelease => !inversed,
                _ => false,
            },
            EntityKind::Object => match event {
                ObjectCreated | ObjectDestroyed | ObjectCustom => true,
                ObjectShot | ObjectBump => !inversed,
                _ => false,
            },
            EntityKind::Pickup => match event {
                PickupCreated | PickupDestroyed | PickupCustom | PickupRespawn => true,
                PickupClaimed | PickupCollected => !inversed,
                _ => false,
            },
            EntityKind::Player => match event {
                PlayerCreated | PlayerDestroyed | PlayerCustom | PlayerAway | PlayerGameKeys
                | PlayerRename | PlayerRequestClass | PlayerRequestSpawn | PlayerSpawn
                | PlayerStartTyping | PlayerStopTyping | PlayerChat | PlayerCommand
                | PlayerMessage | PlayerHealth | PlayerArmour | PlayerWeapon | PlayerMove
                | PlayerWasted | PlayerKilled | PlayerTeamKill | PlayerSpectate
                | PlayerCrashreport | PlayerBurning | PlayerCrouching | PlayerState
                | PlayerAction | StateNone | StateNormal | StateShooting | StateDriver
                | StatePassenger | StateEnterDriver | StateEnterPassenger
                | StateExitVehicle | StateUnspawned | ActionNone | ActionNormal
                | ActionAiming | ActionShooting | ActionJumping | ActionLieDown
                | ActionGettingUp | ActionJumpVehicle | ActionDriving | ActionDying
                | ActionWasted | ActionEmbarking | ActionDisembarking => true,
                KeybindKeyPress | KeybindKeyRelease | VehicleEmbarking | VehicleEmbarked
                | VehicleDisembark | PickupClaimed | PickupCollected | ObjectShot
                | ObjectBump | CheckpointEntered | CheckpointExited | SphereEntered
                | SphereExited => inversed,
                _ => false,
            },
            EntityKind::Sphere => match event {
                SphereCreated | SphereDestroyed | SphereCustom => true,
                SphereEntered | SphereExited => !inversed,
                _ => false,
            },
            EntityKind::Sprite => {
                matches!(event, SpriteCreated | SpriteDestroyed | SpriteCustom)
            }
            EntityKind::Textdraw => {
                matches!(event, TextdrawCreated | TextdrawDestroyed | TextdrawCustom)
            }
            EntityKind::Vehicle => match event {
                VehicleCreated | VehicleDestroyed | VehicleCustom | VehicleRespawn
                | VehicleExplode | VehicleHealth | VehicleMove => true,
                VehicleEmbarking | VehicleEmbarked | VehicleDisembark => !inversed,
                _ => false,
            },
        }
    }

    /// Whether entities of this kind ever participate in `event`, in any role.
    pub fn in_event(self, event: EventKind) -> bool {
        self.in_event_for(event, false) || self.in_event_for(event, true)
    }
}

bitflags! {
    /// Subset of entity kinds, used for the primary/secondary participant
    /// gates on global events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KindMask: u16 {
        const BLIP = 1 << 0;
        const CHECKPOINT = 1 << 1;
        const KEYBIND = 1 << 2;
        const OBJECT = 1 << 3;
        const PICKUP = 1 << 4;
        const PLAYER = 1 << 5;
        const SPHERE = 1 << 6;
        const SPRITE = 1 << 7;
        const TEXTDRAW = 1 << 8;
        const VEHICLE = 1 << 9;
    }
}

impl KindMask {
    pub fn from_kind(kind: EntityKind) -> KindMask {
        KindMask::from_bits_truncate(1 << kind.index() as u16)
    }

    pub fn contains_kind(self, kind: EntityKind) -> bool {
        self.contains(KindMask::from_kind(kind))
    }
}

impl Default for KindMask {
    fn default() -> Self {
        KindMask::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Color {
        Color { r, g, b, a }
    }

    pub fn from_rgba(rgba: u32) -> Color {
        Color {
            r: (rgba >> 24) as u8,
            g: (rgba >> 16) as u8,
            b: (rgba >> 8) as u8,
            a: rgba as u8,
        }
    }
}

/// Creation-time data kept on the slot. Only the kinds whose creation
/// parameters stay meaningful after the fact store anything.
#[derive(Debug, Clone, Default)]
pub enum EntityPayload {
    #[default]
    None,
    Blip {
        world: i32,
        scale: i32,
        sprite: i32,
        position: Vec3,
        color: Color,
    },
    Keybind {
        primary: i32,
        secondary: i32,
        alternative: i32,
        release: bool,
    },
    Sprite {
        path: String,
    },
    Textdraw {
        text: String,
    },
}
