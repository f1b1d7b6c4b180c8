// SPDX-License-Identifier: GPL-3.0-or-later

//! Input formats the generator can read diagrams from.

pub mod yaml;
