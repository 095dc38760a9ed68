// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Buffered warnings. Argument parsing collects its complaints here so
//! they can be shown together, after the parsed setup has been reported.

use std::{borrow::Cow, sync::Mutex};

const VERTICAL_AND_RIGHT: char = '├';
const UP_AND_RIGHT: char = '└';

lazy_static::lazy_static! {
    static ref WARNINGS: Mutex<Vec<Cow<'static, str>>> = Mutex::new(vec![]);
}

pub(crate) trait Warn {
    fn warn(self);
}

impl Warn for &'static str {
    fn warn(self) {
        WARNINGS.lock().unwrap().push(self.into());
    }
}

impl Warn for String {
    fn warn(self) {
        WARNINGS.lock().unwrap().push(self.into());
    }
}

/// Print any buffered warnings as one block, then clear the buffer.
pub(crate) fn display_warnings() {
    let mut warnings = WARNINGS.lock().unwrap();
    if warnings.is_empty() {
        return;
    }
    log::warn!("{}", console::style("Warnings").bold());
    let num = warnings.len();
    for (i, line) in warnings.iter().enumerate() {
        let symbol = if i + 1 == num {
            UP_AND_RIGHT
        } else {
            VERTICAL_AND_RIGHT
        };
        log::warn!("{symbol} {line}");
    }
    log::warn!("");
    warnings.clear();
}
