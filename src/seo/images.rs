const PLACEHOLDER_PHOTOS: [&str; 8] = [
    "photo-1460925895917-afdab827c52f",
    "photo-1432888622747-4eb9a8efeb07",
    "photo-1498050108023-c5249f4df085",
    "photo-1553877522-43269d4ea984",
    "photo-1504868584819-f8e8b4b6d7e3",
    "photo-1552664730-d307ca884978",
    "photo-1519389950473-47ba0277781c",
    "photo-1516321318423-f06f85e504b3",
];

const IMAGE_COUNT: usize = 4;

/// Search prompt for the image stage: the topic plus the first two keywords.
pub fn image_prompt(topic: &str, keywords: &[String]) -> String {
    let mut parts = vec![topic.trim().to_string()];
    parts.extend(
        keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && !k.eq_ignore_ascii_case(topic.trim()))
            .take(2),
    );
    parts.retain(|p| !p.is_empty());
    parts.join(" ")
}

/// Deterministic placeholder stock photos for a prompt. The same prompt
/// always yields the same photos so re-running the stage is stable.
pub fn mock_images(prompt: &str) -> Vec<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Vec::new();
    }

    let offset = prompt
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
        % PLACEHOLDER_PHOTOS.len();
    let query = urlencoding::encode(prompt);

    (0..IMAGE_COUNT)
        .map(|i| {
            let photo = PLACEHOLDER_PHOTOS[(offset + i) % PLACEHOLDER_PHOTOS.len()];
            format!("https://images.unsplash.com/{photo}?w=1200&q=80&query={query}")
        })
        .collect()
}
