// Filtering and search over the todo collection

use crate::models::{Todo, TodoPriority, TodoStatus};

/// Conjunctive set of optional predicates
///
/// An absent field imposes no constraint. An empty `search_query`, empty
/// `category` or empty `tags` list is treated the same as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub category: Option<String>,
    pub search_query: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl TodoFilter {
    /// True when no predicate is active
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && active_str(&self.category).is_none()
            && active_str(&self.search_query).is_none()
            && self.active_tags().is_none()
    }

    /// Check one record against every active predicate
    pub fn matches(&self, todo: &Todo) -> bool {
        if let Some(query) = active_str(&self.search_query) {
            let query = query.to_lowercase();
            let hit = todo.title.to_lowercase().contains(&query)
                || todo.description.to_lowercase().contains(&query)
                || todo.tags.iter().any(|tag| tag.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }

        if self.status.is_some_and(|status| todo.status != status) {
            return false;
        }

        if self.priority.is_some_and(|priority| todo.priority != priority) {
            return false;
        }

        if active_str(&self.category).is_some_and(|category| todo.category != category) {
            return false;
        }

        // Any overlap, not subset
        if self
            .active_tags()
            .is_some_and(|tags| !tags.iter().any(|tag| todo.tags.contains(tag)))
        {
            return false;
        }

        true
    }

    /// Records passing the filter, in collection order
    pub fn apply<'a>(&self, todos: &'a [Todo]) -> Vec<&'a Todo> {
        todos.iter().filter(|todo| self.matches(todo)).collect()
    }

    /// Shallow-merge a partial update; fields it does not mention are kept
    pub fn merge(&mut self, update: FilterUpdate) {
        merge_field(&mut self.status, update.status);
        merge_field(&mut self.priority, update.priority);
        merge_field(&mut self.category, update.category);
        merge_field(&mut self.search_query, update.search_query);
        merge_field(&mut self.tags, update.tags);
    }

    fn active_tags(&self) -> Option<&[String]> {
        self.tags.as_deref().filter(|tags| !tags.is_empty())
    }
}

/// Partial filter change for `TodoStore::update_filter`
///
/// Each field is `None` (not mentioned, keep current value), `Some(None)`
/// (clear) or `Some(Some(v))` (set).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub status: Option<Option<TodoStatus>>,
    pub priority: Option<Option<TodoPriority>>,
    pub category: Option<Option<String>>,
    pub search_query: Option<Option<String>>,
    pub tags: Option<Option<Vec<String>>>,
}

impl FilterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: Option<TodoStatus>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn priority(mut self, priority: Option<TodoPriority>) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn category(mut self, category: Option<String>) -> Self {
        self.category = Some(category);
        self
    }

    pub fn search_query(mut self, query: Option<String>) -> Self {
        self.search_query = Some(query);
        self
    }

    pub fn tags(mut self, tags: Option<Vec<String>>) -> Self {
        self.tags = Some(tags);
        self
    }
}

fn merge_field<T>(slot: &mut Option<T>, change: Option<Option<T>>) {
    if let Some(value) = change {
        *slot = value;
    }
}

fn active_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewTodo;
    use chrono::{TimeZone, Utc};

    fn todo(id: &str, new: NewTodo) -> Todo {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        new.into_todo(id.to_string(), now)
    }

    fn sample() -> Vec<Todo> {
        vec![
            todo(
                "1",
                NewTodo::new("Fix login bug")
                    .description("Session expires too early")
                    .priority(TodoPriority::Urgent)
                    .category("work")
                    .tags(["urgent-fix", "auth"]),
            ),
            todo(
                "2",
                NewTodo::new("Buy groceries")
                    .status(TodoStatus::Done)
                    .priority(TodoPriority::Low)
                    .category("home")
                    .tags(["errands"]),
            ),
            todo(
                "3",
                NewTodo::new("Patch payment flow")
                    .status(TodoStatus::InProgress)
                    .priority(TodoPriority::High)
                    .category("work")
                    .tags(["urgent-fix", "Billing"]),
            ),
            todo("4", NewTodo::new("Read a book")),
        ]
    }

    fn ids(todos: &[&Todo]) -> Vec<String> {
        todos.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything_in_order() {
        let todos = sample();
        let filter = TodoFilter::default();

        assert!(filter.is_empty());
        assert_eq!(ids(&filter.apply(&todos)), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let todos = sample();

        let by_title = TodoFilter {
            search_query: Some("LOGIN".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&by_title.apply(&todos)), vec!["1"]);

        let by_description = TodoFilter {
            search_query: Some("expires".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&by_description.apply(&todos)), vec!["1"]);

        let by_tag = TodoFilter {
            search_query: Some("billing".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&by_tag.apply(&todos)), vec!["3"]);
    }

    #[test]
    fn test_empty_strings_are_inactive() {
        let todos = sample();
        let filter = TodoFilter {
            search_query: Some(String::new()),
            category: Some(String::new()),
            tags: Some(Vec::new()),
            ..Default::default()
        };

        assert!(filter.is_empty());
        assert_eq!(filter.apply(&todos).len(), todos.len());
    }

    #[test]
    fn test_exact_match_predicates() {
        let todos = sample();

        let done = TodoFilter {
            status: Some(TodoStatus::Done),
            ..Default::default()
        };
        assert_eq!(ids(&done.apply(&todos)), vec!["2"]);

        let high = TodoFilter {
            priority: Some(TodoPriority::High),
            ..Default::default()
        };
        assert_eq!(ids(&high.apply(&todos)), vec!["3"]);

        let work = TodoFilter {
            category: Some("work".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&work.apply(&todos)), vec!["1", "3"]);

        // Category match is exact, not substring or case-folded
        let partial = TodoFilter {
            category: Some("Work".to_string()),
            ..Default::default()
        };
        assert!(partial.apply(&todos).is_empty());
    }

    #[test]
    fn test_tags_match_on_any_overlap() {
        let todos = sample();
        let filter = TodoFilter {
            tags: Some(vec!["urgent-fix".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&todos)), vec!["1", "3"]);

        let either = TodoFilter {
            tags: Some(vec!["errands".to_string(), "auth".to_string()]),
            ..Default::default()
        };
        assert_eq!(ids(&either.apply(&todos)), vec!["1", "2"]);
    }

    #[test]
    fn test_predicates_are_conjunctive() {
        let todos = sample();
        let filter = TodoFilter {
            category: Some("work".to_string()),
            tags: Some(vec!["urgent-fix".to_string()]),
            status: Some(TodoStatus::InProgress),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&todos)), vec!["3"]);
    }

    #[test]
    fn test_merge_preserves_unmentioned_fields() {
        let mut filter = TodoFilter::default();
        filter.merge(FilterUpdate::new().status(Some(TodoStatus::Todo)));
        filter.merge(FilterUpdate::new().category(Some("work".to_string())));

        assert_eq!(filter.status, Some(TodoStatus::Todo));
        assert_eq!(filter.category.as_deref(), Some("work"));

        filter.merge(FilterUpdate::new().status(None));
        assert_eq!(filter.status, None);
        assert_eq!(filter.category.as_deref(), Some("work"));
    }
}
