// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod events_handler;
pub mod images_handler;
pub mod metadata_handler;
pub mod well_known_handler;
