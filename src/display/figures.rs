//! Figure construction from aligned trace sets.

use crate::align::{AlignedTrace, AlignedTraceSet, Normalization};
use crate::layout::{CcdPosition, RAFT_COLUMNS, RAFT_ROWS};
use crate::render::{ClockTrack, Panel, Series};

pub(crate) fn y_label(normalization: Normalization) -> &'static str {
    match normalization {
        Normalization::None => "ADU",
        Normalization::Offset => "ADU - mean",
        Normalization::Standardize => "z-score",
    }
}

fn series(member: &AlignedTrace, label: String) -> Series {
    Series::from_xy(label, &member.x_values(), &member.trace.samples)
}

fn x_label(set: &AlignedTraceSet) -> String {
    set.members
        .first()
        .map(|m| m.axis.unit())
        .unwrap_or("sample")
        .to_string()
}

/// Panel overlaying every member, labelled by source.
pub(crate) fn source_panel(
    title: String,
    set: &AlignedTraceSet,
    normalization: Normalization,
    with_clock: bool,
) -> Panel {
    let mut panel = Panel::new(title).with_x_label(x_label(set));
    panel.y_label = y_label(normalization).to_string();
    panel.series = set
        .members
        .iter()
        .map(|m| series(m, m.trace.source.display_name()))
        .collect();
    if with_clock {
        panel.clock_track = set.members.first().and_then(|m| ClockTrack::from_axis(&m.axis));
    }
    panel
}

/// Panel overlaying the channels of one source, labelled by channel.
pub(crate) fn channel_panel(
    title: String,
    set: &AlignedTraceSet,
    normalization: Normalization,
) -> Panel {
    let mut panel = Panel::new(title).with_x_label(x_label(set));
    panel.y_label = y_label(normalization).to_string();
    panel.series = set
        .members
        .iter()
        .map(|m| series(m, format!("c{:02}", m.trace.channel)))
        .collect();
    panel
}

/// Blank panel marking a raft position with no data.
pub(crate) fn missing_panel(ccd: CcdPosition) -> Panel {
    Panel::new(format!("CCD {} (missing)", ccd))
}

/// Order mosaic panels row-major, filling absent positions with blanks.
pub(crate) fn mosaic_panels(mut present: Vec<(CcdPosition, Panel)>) -> Vec<Panel> {
    let mut panels = Vec::with_capacity(usize::from(RAFT_ROWS * RAFT_COLUMNS));
    for ccd in CcdPosition::all() {
        match present.iter().position(|(pos, _)| *pos == ccd) {
            Some(i) => panels.push(present.swap_remove(i).1),
            None => panels.push(missing_panel(ccd)),
        }
    }
    panels
}

/// File-stem friendly version of a label.
pub(crate) fn slug(text: &str) -> String {
    let slug: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug.trim_matches('-').to_string()
}
