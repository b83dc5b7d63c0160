//! # Alyx Core
//!
//! The gateway-facing vocabulary shared by every Alyx crate.
//!
//! This crate does not talk to a chat service itself. It defines the types
//! the framework reasons about and the [`Gateway`] trait a concrete
//! connection implements:
//!
//! - **Identifiers** - snowflake newtypes ([`UserId`], [`ChannelId`], ...)
//! - **Entities** - [`User`], [`Role`], [`Channel`], [`Emote`]
//! - **Events** - the [`Event`] trait plus [`MessageEvent`] and [`ReactionEvent`]
//! - **Authorization vocabulary** - [`Permission`] tokens and [`PermissionLevel`]
//! - **Outbound replies** - [`Reply`]
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  alyx-runtime   (config, logging, AlyxBot)    │
//! ├───────────────────────────────────────────────┤
//! │  alyx-framework (commands, plugins, waiter)   │
//! ├───────────────────────────────────────────────┤
//! │  alyx-core      (ids, events, Gateway trait)  │
//! └───────────────────────────────────────────────┘
//! ```

pub mod entity;
pub mod error;
pub mod event;
pub mod gateway;
pub mod id;
pub mod permission;
pub mod reply;

pub use entity::{Channel, Emote, Role, User};
pub use error::{GatewayError, GatewayResult};
pub use event::{BoxedEvent, Event, MessageEvent, ReactionEvent};
pub use gateway::{BoxedGateway, Gateway};
pub use id::{ChannelId, EmoteId, GuildId, MessageId, RoleId, UserId};
pub use permission::{Permission, PermissionLevel, PermissionScope};
pub use reply::{Color, Reply};
