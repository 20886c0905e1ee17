// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub const SLASH_SEPARATOR: &str = "/";

/// Returns the shortest path equivalent to `path` by purely lexical
/// processing: repeated separators collapse, `.` elements drop and `..`
/// elements remove the preceding element. An empty result becomes ".".
///
/// Only `/` is treated as a separator.
pub fn clean(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let rooted = path.starts_with(SLASH_SEPARATOR);
    let mut elems: Vec<&str> = Vec::new();

    for elem in path.split(SLASH_SEPARATOR) {
        match elem {
            "" | "." => {}
            ".." => {
                if elems.last().is_some_and(|last| *last != "..") {
                    elems.pop();
                } else if !rooted {
                    elems.push("..");
                }
            }
            _ => elems.push(elem),
        }
    }

    let joined = elems.join(SLASH_SEPARATOR);
    if rooted {
        format!("{SLASH_SEPARATOR}{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}

/// Reports whether a cleaned path names nothing usable as a disk root.
pub fn is_empty_or_root(cleaned: &str) -> bool {
    matches!(cleaned, "" | "." | "/" | "\\")
}
