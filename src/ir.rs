// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory model of a structured diagram.
//!
//! The element tree is owned by the caller (editor, test, frontend) and is
//! read-only for the generation engine: generators decorate it transiently
//! through side tables, never by mutating element text.

pub use element::{Element, Program, Root, Subqueue};
pub use types::{TypeDescriptor, TypeMap};

pub mod element;
pub mod keywords;
pub mod types;
