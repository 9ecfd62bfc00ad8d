use std::collections::HashSet;

/// Makes a header usable as a unique column name: trims it, names blanks by
/// position and suffixes repeats with `_1`, `_2`, ...
pub fn unique_column_name(name: &str, position: usize, existing_names: &mut HashSet<String>) -> String {
    let trimmed = name.trim();
    let base_name = if trimmed.is_empty() {
        format!("column_{}", position + 1)
    } else {
        trimmed.to_string()
    };

    // If the name already exists, add a numeric suffix
    let mut cleaned = base_name.clone();
    let mut counter = 1;
    while !existing_names.insert(cleaned.clone()) {
        cleaned = format!("{}_{}", base_name, counter);
        counter += 1;
    }

    cleaned
}

pub fn unique_headers<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut existing_names = HashSet::new();
    names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| unique_column_name(name, idx, &mut existing_names))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_headers() {
        let headers = unique_headers(vec![" id ", "", "value", "value", "value_1"]);
        assert_eq!(headers, vec!["id", "column_2", "value", "value_1", "value_1_1"]);
    }
}
