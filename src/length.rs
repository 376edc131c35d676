use crate::schema::length::SLACK_FACTOR;
use crate::segment::Segment;

/// Running laid length after each segment.
///
/// Every parseable segment length is multiplied by the slack factor and added
/// to the total. A segment without a length repeats the previous total; it is
/// `None` only while no length has been seen yet.
pub fn cumulative_lengths(segments: &[Segment]) -> Vec<Option<f64>> {
    let mut total: Option<f64> = None;
    segments
        .iter()
        .map(|segment| {
            if let Some(length) = segment.length.as_ref().and_then(|m| m.value) {
                total = Some(total.unwrap_or(0.0) + length * SLACK_FACTOR);
            }
            total
        })
        .collect()
}
