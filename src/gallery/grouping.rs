//! Time-window grouping of new media.
//!
//! Files are sorted by timestamp (then name) and partitioned greedily: a file
//! joins the open group while it lies within `window` of the group's *first*
//! file and the group is below `max_size`; otherwise it opens a new group.
//! The window is anchored, not sliding, so a steady trickle of shots one
//! minute apart still splits every `window` minutes.

use crate::types::MediaFile;
use chrono::TimeDelta;

pub fn group_by_time_window<'a>(
    files: &[&'a MediaFile],
    window: TimeDelta,
    max_size: usize,
) -> Vec<Vec<&'a MediaFile>> {
    let max_size = max_size.max(1);
    let mut sorted = files.to_vec();
    sorted.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut groups: Vec<Vec<&MediaFile>> = Vec::new();
    for file in sorted {
        let joins = groups.last().is_some_and(|group| {
            group.len() < max_size && file.created_at - group[0].created_at <= window
        });
        match groups.last_mut() {
            Some(group) if joins => group.push(file),
            _ => groups.push(vec![file]),
        }
    }
    groups
}
