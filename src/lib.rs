// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod importers;
pub mod repository;
pub mod services;
pub mod utils;
