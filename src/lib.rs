/*
 * This file is part of Thermfan.
 *
 * Copyright (C) 2025 Thermfan contributors
 *
 * Thermfan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Thermfan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Thermfan. If not, see <https://www.gnu.org/licenses/>.
 */


//! Thermfan - fan control daemon for Dell laptops
//!
//! This crate holds the daemon side of Thermfan: where settings come from,
//! how the process is set up and torn down, and the async loop that drives
//! the `tf_core` scheduler.

pub mod config;
pub mod daemon;
pub mod logging;
pub mod runtime;
