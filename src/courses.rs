use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub prerequisites: Vec<PrerequisiteRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseTab {
    All,
    Completed,
    Incomplete,
}

impl CourseTab {
    /// Unknown tab names behave like "all".
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "incomplete" => Self::Incomplete,
            _ => Self::All,
        }
    }

    fn keeps(self, course: &Course) -> bool {
        match self {
            Self::All => true,
            Self::Completed => course.completed,
            Self::Incomplete => !course.completed,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CourseError {
    #[error("prerequisite course not found: {0}")]
    UnknownPrerequisite(String),

    #[error("a course cannot be its own prerequisite: {0}")]
    SelfPrerequisite(String),

    #[error("prerequisite listed more than once: {0}")]
    DuplicatePrerequisite(String),
}

#[derive(Clone, Copy)]
enum Mark {
    Unvisited,
    InProgress,
    Placed(usize),
}

struct Frame {
    course: usize,
    next_prereq: usize,
    max_prereq_level: Option<usize>,
}

/// Groups courses into dependency levels, level 0 first.
///
/// Walks courses in input order with an explicit stack. A prerequisite edge
/// that reaches a course still being resolved (a cycle) or an id missing
/// from `courses` adds no constraint. In a cycle the member whose edge
/// closes the loop lands lowest: A -> B -> C -> A gives `[[C], [B], [A]]`.
pub fn sort_courses_by_prerequisites(courses: &[Course]) -> Vec<Vec<&Course>> {
    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(courses.len());
    for (i, c) in courses.iter().enumerate() {
        index_by_id.entry(c.id.as_str()).or_insert(i);
    }

    let mut marks = vec![Mark::Unvisited; courses.len()];
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for root in 0..courses.len() {
        if !matches!(marks[root], Mark::Unvisited) {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push(Frame {
            course: root,
            next_prereq: 0,
            max_prereq_level: None,
        });

        while let Some(top) = stack.last_mut() {
            let prereqs = &courses[top.course].prerequisites;
            if let Some(p) = prereqs.get(top.next_prereq) {
                top.next_prereq += 1;
                let Some(&j) = index_by_id.get(p.id.as_str()) else {
                    continue;
                };
                let mark = marks[j];
                match mark {
                    Mark::Unvisited => {
                        marks[j] = Mark::InProgress;
                        stack.push(Frame {
                            course: j,
                            next_prereq: 0,
                            max_prereq_level: None,
                        });
                    }
                    Mark::InProgress => {}
                    Mark::Placed(level) => {
                        top.max_prereq_level = top.max_prereq_level.max(Some(level));
                    }
                }
                continue;
            }

            let level = top.max_prereq_level.map_or(0, |l| l + 1);
            let course = top.course;
            stack.pop();
            marks[course] = Mark::Placed(level);
            if buckets.len() <= level {
                buckets.resize_with(level + 1, Vec::new);
            }
            buckets[level].push(course);
            if let Some(parent) = stack.last_mut() {
                parent.max_prereq_level = parent.max_prereq_level.max(Some(level));
            }
        }
    }

    buckets
        .into_iter()
        .map(|bucket| bucket.into_iter().map(|i| &courses[i]).collect())
        .collect()
}

pub fn flatten_sorted_courses<'a>(levels: &[Vec<&'a Course>]) -> Vec<&'a Course> {
    levels.iter().flatten().copied().collect()
}

/// Completion-tab filter AND case-insensitive name search, order preserved.
pub fn filter_courses<'a, I>(courses: I, tab: CourseTab, search_query: &str) -> Vec<&'a Course>
where
    I: IntoIterator<Item = &'a Course>,
{
    let needle = search_query.to_lowercase();
    courses
        .into_iter()
        .filter(|c| tab.keeps(c))
        .filter(|c| needle.is_empty() || c.name.to_lowercase().contains(&needle))
        .collect()
}

pub fn is_prerequisite_for_other_courses(courses: &[Course], course_id: &str) -> bool {
    courses.iter().any(|c| {
        c.id != course_id && c.prerequisites.iter().any(|p| p.id == course_id)
    })
}

/// Checks a proposed prerequisite list for the course `course_id` (or a
/// course about to be created when `None`).
pub fn validate_prerequisites(
    courses: &[Course],
    course_id: Option<&str>,
    prerequisite_ids: &[String],
) -> Result<(), CourseError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(prerequisite_ids.len());
    for id in prerequisite_ids {
        if !courses.iter().any(|c| c.id == *id) {
            return Err(CourseError::UnknownPrerequisite(id.clone()));
        }
        if !seen.insert(id.as_str()) {
            return Err(CourseError::DuplicatePrerequisite(id.clone()));
        }
    }
    if let Some(own) = course_id {
        if prerequisite_ids.iter().any(|id| id == own) {
            return Err(CourseError::SelfPrerequisite(own.to_string()));
        }
    }
    Ok(())
}

/// Drops the course and every prerequisite edge pointing at it.
pub fn remove_course(courses: &[Course], course_id: &str) -> Vec<Course> {
    courses
        .iter()
        .filter(|c| c.id != course_id)
        .map(|c| Course {
            prerequisites: c
                .prerequisites
                .iter()
                .filter(|p| p.id != course_id)
                .cloned()
                .collect(),
            ..c.clone()
        })
        .collect()
}
