//! Caption templates
//!
//! A caption template is free text where `%p` stands for the path of the
//! file shown in that panel.

use crate::core::Instance;

/// Token replaced by the panel's path
pub const PATH_PLACEHOLDER: &str = "%p";

/// Carries caption templates over a pattern list edit.
///
/// A new pattern keeps the template of the previous pattern with the same
/// string, preferring the same position, then any unused previous slot.
/// Patterns with no traceable predecessor get `default_template`.
pub fn update_caption_templates(
    previous_templates: &[String],
    previous_patterns: &[String],
    new_patterns: &[String],
    default_template: &str,
) -> Vec<String> {
    let usable = previous_patterns.len().min(previous_templates.len());
    let mut used = vec![false; usable];
    let mut templates: Vec<Option<String>> = vec![None; new_patterns.len()];

    for (i, pattern) in new_patterns.iter().enumerate() {
        if i < usable && previous_patterns[i] == *pattern {
            templates[i] = Some(previous_templates[i].clone());
            used[i] = true;
        }
    }

    for (i, pattern) in new_patterns.iter().enumerate() {
        if templates[i].is_some() {
            continue;
        }
        if let Some(j) = (0..usable).find(|&j| !used[j] && previous_patterns[j] == *pattern) {
            templates[i] = Some(previous_templates[j].clone());
            used[j] = true;
        }
    }

    templates
        .into_iter()
        .map(|template| template.unwrap_or_else(|| default_template.to_string()))
        .collect()
}

/// Substitutes each panel's path into its template; missing paths become empty
pub fn render_captions(templates: &[String], instance: &Instance) -> Vec<String> {
    templates
        .iter()
        .enumerate()
        .map(|(i, template)| {
            let path = instance
                .path(i)
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            template.replace(PATH_PLACEHOLDER, &path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unchanged_patterns_keep_templates() {
        let templates = update_caption_templates(
            &strings(&["A: %p", "B: %p"]),
            &strings(&["a/*", "b/*"]),
            &strings(&["a/*", "b/*"]),
            "%p",
        );
        assert_eq!(templates, strings(&["A: %p", "B: %p"]));
    }

    #[test]
    fn test_templates_follow_moved_patterns() {
        let templates = update_caption_templates(
            &strings(&["A: %p", "B: %p", "C: %p"]),
            &strings(&["a/*", "b/*", "c/*"]),
            &strings(&["c/*", "new/*", "a/*"]),
            "%p",
        );
        assert_eq!(templates, strings(&["C: %p", "%p", "A: %p"]));
    }

    #[test]
    fn test_duplicate_patterns_use_each_template_once() {
        let templates = update_caption_templates(
            &strings(&["first", "second"]),
            &strings(&["x", "x"]),
            &strings(&["y", "x", "x", "x"]),
            "%p",
        );
        // Position 1 keeps its own template, position 2 takes the unused one
        assert_eq!(templates, strings(&["%p", "second", "first", "%p"]));
    }

    #[test]
    fn test_render_captions() {
        let instance = Instance {
            paths: vec![Some(PathBuf::from("a/1.png")), None],
            magic_expression_matches: strings(&["1"]),
        };
        let captions = render_captions(&strings(&["Left %p (%p)", "Right: %p"]), &instance);
        assert_eq!(captions, strings(&["Left a/1.png (a/1.png)", "Right: "]));
    }
}
