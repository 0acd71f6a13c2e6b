//! Chat-platform interface and the interactive team-setup flow.
//!
//! This crate owns everything between the platform seam and the domain:
//! - **Gateway** (`gateway`) - role/member/message operations behind a trait
//! - **Events** (`events`) - per-session selection and message waits
//! - **Commands** (`commands`) - `/setup`, `/showmap`, `/updatemap` routing
//! - **Messages** (`messages`) - embed and button payload builders
//! - **Provisioning** (`provision`) - team + color role creation
//! - **Setup flow** (`setup`) - the selection/timeout/cleanup state machine
//! - **Runner** (`runner`) - ingress loop feeding commands and sessions
//!
//! # Architecture
//!
//! ```text
//! Platform Events → BotRunner → CommandRouter → RosterService → SetupFlow
//!                        ↓                                          ↓
//!                 SessionRegistry  ──────────────────────→  SessionEvents
//! ```

pub mod commands;
pub mod events;
pub mod gateway;
pub mod messages;
pub mod provision;
pub mod runner;
pub mod service;
pub mod setup;
