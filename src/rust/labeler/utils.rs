/// Replaces every whitespace character in a label with an underscore.
pub(crate) fn normalize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Parses a label file: one label per line, trailing whitespace stripped.
///
/// Blank lines at the end are dropped; blank lines in the middle are kept so
/// that line numbers still match output indices.
pub(crate) fn parse_labels(text: &str) -> Vec<String> {
    let mut labels: Vec<String> = text.lines().map(|line| line.trim_end().to_string()).collect();
    while labels.last().is_some_and(|l| l.is_empty()) {
        labels.pop();
    }
    labels
}

pub(crate) fn softmax(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

/// Pairs labels with scores and sorts by descending confidence. Ties keep label order.
pub(crate) fn rank_scores(labels: &[String], scores: &[f32]) -> Vec<(String, f32)> {
    let mut ranked: Vec<(String, f32)> = labels
        .iter()
        .zip(scores.iter().copied())
        .map(|(label, score)| (normalize_label(label), score))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
