use crate::model::norm_key;

#[derive(Debug, Clone)]
pub struct Component {
    pub name: String,
    pub weight: u32,
}

#[derive(Debug, Clone)]
pub struct Course {
    pub key: String,
    pub name: String,
    // Kept as a list: calculation and input forms follow the defined order.
    pub components: Vec<Component>,
}

impl Course {
    fn new(key: &str, name: &str, components: &[(&str, u32)]) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            components: components
                .iter()
                .map(|(name, weight)| Component {
                    name: name.to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }
}

/// Fixed course definitions, built once at startup and never mutated.
/// Component weights for each course sum to 100 by construction.
#[derive(Debug, Clone)]
pub struct Catalog {
    courses: Vec<Course>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            courses: vec![
                Course::new("math", "Math", &[("exam", 80), ("homework", 20)]),
                Course::new(
                    "programming",
                    "Programming",
                    &[("exam", 40), ("project", 40), ("homework", 20)],
                ),
                Course::new(
                    "web_development",
                    "Web Development",
                    &[("project", 80), ("homework", 20)],
                ),
            ],
        }
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn by_key(&self, key: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.key == key)
    }

    pub fn by_display_name(&self, name: &str) -> Option<&Course> {
        let wanted = norm_key(name);
        self.courses.iter().find(|c| norm_key(&c.name) == wanted)
    }
}
