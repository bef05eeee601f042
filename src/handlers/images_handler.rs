// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::Path;

use actix_files::Files;
use actix_web::web;

/// Serves the git checkout under `mount_path`, so that logo urls published
/// in the metadata resolve. Dot files (`.git` included) are not served.
pub fn scoped_config(cfg: &mut web::ServiceConfig, mount_path: &str, folder: &Path) {
    cfg
    .service(Files::new(mount_path, folder));
}
