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

use super::error::DiskError;

/// Returns the most frequent outcome across disks and how often it occurred.
/// `None` entries are successes and win ties against any error.
pub fn reduce_errs(errors: &[Option<DiskError>], ignored_errs: &[DiskError]) -> (usize, Option<DiskError>) {
    let mut counts: Vec<(Option<&DiskError>, usize)> = Vec::new();
    for err in errors.iter().map(Option::as_ref) {
        if err.is_some_and(|e| is_ignored_err(ignored_errs, e)) {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == err) {
            Some((_, count)) => *count += 1,
            None => counts.push((err, 1)),
        }
    }

    let best = counts.into_iter().max_by(|(e1, c1), (e2, c2)| {
        c1.cmp(c2).then_with(|| match (e1, e2) {
            (None, _) => std::cmp::Ordering::Greater,
            (_, None) => std::cmp::Ordering::Less,
            (Some(a), Some(b)) => b.to_u32().cmp(&a.to_u32()),
        })
    });

    match best {
        Some((err, count)) => (count, err.cloned()),
        None => (0, None),
    }
}

/// The dominant outcome when at least `quorum` disks agree on it,
/// [`DiskError::ErasureWriteQuorum`] otherwise.
pub fn reduce_write_quorum_errs(errors: &[Option<DiskError>], ignored_errs: &[DiskError], quorum: usize) -> Option<DiskError> {
    let (max_count, err) = reduce_errs(errors, ignored_errs);
    if max_count >= quorum {
        err
    } else {
        Some(DiskError::ErasureWriteQuorum)
    }
}

pub fn is_ignored_err(ignored_errs: &[DiskError], err: &DiskError) -> bool {
    ignored_errs.iter().any(|e| e == err)
}

pub fn count_errs(errors: &[Option<DiskError>], err: &DiskError) -> usize {
    errors.iter().filter(|e| e.as_ref() == Some(err)).count()
}
