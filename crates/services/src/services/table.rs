//! Sorting and pagination for list views.

use std::cmp::Ordering;

use db::models::{staff::StaffMember, student::Student, transaction::Transaction};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

pub const DEFAULT_PAGE_SIZE: usize = 10;
/// Up to this many pages, the window lists every page.
const MAX_VISIBLE_PAGES: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Null,
    Text(String),
    Number(f64),
}

impl From<Option<String>> for SortValue {
    fn from(value: Option<String>) -> Self {
        value.map(SortValue::Text).unwrap_or(SortValue::Null)
    }
}

impl From<Option<f64>> for SortValue {
    fn from(value: Option<f64>) -> Self {
        value.map(SortValue::Number).unwrap_or(SortValue::Null)
    }
}

impl From<&str> for SortValue {
    fn from(value: &str) -> Self {
        SortValue::Text(value.to_string())
    }
}

impl std::fmt::Display for SortValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortValue::Null => Ok(()),
            SortValue::Text(s) => f.write_str(s),
            SortValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Rows that expose named columns for sorting. Unknown keys sort as null.
pub trait Sortable {
    fn sort_value(&self, key: &str) -> SortValue;
}

impl Sortable for Student {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "name" => self.name.as_str().into(),
            "email" => self.email.clone().into(),
            "phone" => self.phone.clone().into(),
            "course" => self.course.clone().into(),
            "status" => self.status.to_string().as_str().into(),
            "created_at" => self.created_at.to_rfc3339().as_str().into(),
            _ => SortValue::Null,
        }
    }
}

impl Sortable for StaffMember {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "name" => self.name.as_str().into(),
            "email" => self.email.as_str().into(),
            "phone" => self.phone.clone().into(),
            "position" => self.position.as_str().into(),
            "salary" => self.salary.into(),
            "status" => self.status.to_string().as_str().into(),
            "created_at" => self.created_at.to_rfc3339().as_str().into(),
            _ => SortValue::Null,
        }
    }
}

impl Sortable for Transaction {
    fn sort_value(&self, key: &str) -> SortValue {
        match key {
            "type" => self.transaction_type.to_string().as_str().into(),
            "category" => self.category.as_str().into(),
            "amount" => SortValue::Number(self.amount),
            "description" => self.description.clone().into(),
            "transaction_date" => self.transaction_date.to_string().as_str().into(),
            _ => SortValue::Null,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

fn fold(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect::<String>().to_lowercase()
}

/// Portuguese-ish collation: base letters first, then accents, then case
/// (lowercase before uppercase).
pub fn compare_text(a: &str, b: &str) -> Ordering {
    fold(a)
        .cmp(&fold(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn compare_present(a: &SortValue, b: &SortValue) -> Ordering {
    match (a, b) {
        (SortValue::Number(x), SortValue::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortValue::Text(x), SortValue::Text(y)) => compare_text(x, y),
        _ => compare_text(&a.to_string(), &b.to_string()),
    }
}

/// Stable sort on one column. Nulls go last whichever the direction.
pub fn sort_by<T: Sortable + Clone>(data: &[T], key: &str, direction: SortDirection) -> Vec<T> {
    let mut keyed: Vec<(SortValue, &T)> = data.iter().map(|row| (row.sort_value(key), row)).collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (SortValue::Null, SortValue::Null) => Ordering::Equal,
        (SortValue::Null, _) => Ordering::Greater,
        (_, SortValue::Null) => Ordering::Less,
        _ => {
            let ord = compare_present(a, b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    });
    keyed.into_iter().map(|(_, row)| row.clone()).collect()
}

/// Column header state. Clicking the same column cycles asc → desc → off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct SortState {
    pub key: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortState {
    pub fn new(key: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            key: Some(key.into()),
            direction: Some(direction),
        }
    }

    pub fn toggle(&mut self, key: &str) {
        if self.key.as_deref() == Some(key) {
            match self.direction {
                Some(SortDirection::Asc) => self.direction = Some(SortDirection::Desc),
                _ => *self = SortState::default(),
            }
        } else {
            *self = SortState::new(key, SortDirection::Asc);
        }
    }

    pub fn apply<T: Sortable + Clone>(&self, data: &[T]) -> Vec<T> {
        match (&self.key, self.direction) {
            (Some(key), Some(direction)) => sort_by(data, key, direction),
            _ => data.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// Page links to render around `current` (1-based).
pub fn page_window(current: usize, total_pages: usize) -> Vec<PageItem> {
    if total_pages <= MAX_VISIBLE_PAGES {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let mut items = vec![PageItem::Page(1)];
    if current > 3 {
        items.push(PageItem::Ellipsis);
    }
    let start = current.saturating_sub(1).max(2);
    let end = (current + 1).min(total_pages - 1);
    items.extend((start..=end).map(PageItem::Page));
    if current + 2 < total_pages {
        items.push(PageItem::Ellipsis);
    }
    items.push(PageItem::Page(total_pages));
    items
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// One page of rows plus what the pager needs to draw itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current: usize,
    pub total_pages: usize,
    pub total_items: usize,
    /// 1-based index of the first and last row shown; `(0, 0)` when empty.
    pub range: (usize, usize),
    pub window: Vec<PageItem>,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages
    }
}

/// Slice `data` to 1-based `page`, clamped into range.
pub fn paginate<T: Clone>(data: &[T], page_size: usize, page: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total = total_pages(data.len(), page_size);
    let current = page.clamp(1, total.max(1));
    let start = (current - 1) * page_size;
    let end = (start + page_size).min(data.len());
    let items = data.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
    let range = if items.is_empty() { (0, 0) } else { (start + 1, end) };
    Page {
        items,
        current,
        total_pages: total,
        total_items: data.len(),
        range,
        window: page_window(current, total),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub page_size: usize,
    current: usize,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
            current: 1,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn go_to(&mut self, page: usize, len: usize) {
        self.current = page.clamp(1, total_pages(len, self.page_size).max(1));
    }

    pub fn next(&mut self, len: usize) {
        self.go_to(self.current + 1, len);
    }

    pub fn previous(&mut self, len: usize) {
        self.go_to(self.current.saturating_sub(1), len);
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    pub fn page<T: Clone>(&self, data: &[T]) -> Page<T> {
        paginate(data, self.page_size, self.current)
    }
}

/// Sort then paginate. Changing the sort goes back to the first page.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    pub sort: SortState,
    pub pager: Paginator,
}

impl TableView {
    pub fn toggle_sort(&mut self, key: &str) {
        self.sort.toggle(key);
        self.pager.reset();
    }

    pub fn render<T: Sortable + Clone>(&self, data: &[T]) -> Page<T> {
        self.pager.page(&self.sort.apply(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        name: Option<&'static str>,
        value: Option<f64>,
        tag: usize,
    }

    impl Sortable for Row {
        fn sort_value(&self, key: &str) -> SortValue {
            match key {
                "name" => self.name.map(str::to_string).into(),
                "value" => self.value.into(),
                _ => SortValue::Null,
            }
        }
    }

    fn rows() -> Vec<Row> {
        let names = [Some("Óscar"), None, Some("ana"), Some("Bruno"), Some("Ana"), None, Some("álvaro")];
        let values = [Some(3.0), Some(1.0), None, Some(10.0), Some(2.0), Some(2.0), None];
        names
            .into_iter()
            .zip(values)
            .enumerate()
            .map(|(tag, (name, value))| Row { name, value, tag })
            .collect()
    }

    fn names(rows: &[Row]) -> Vec<Option<&'static str>> {
        rows.iter().map(|r| r.name).collect()
    }

    #[test]
    fn text_sort_is_accent_and_case_insensitive_with_nulls_last() {
        let sorted = sort_by(&rows(), "name", SortDirection::Asc);
        assert_eq!(
            names(&sorted),
            vec![Some("álvaro"), Some("ana"), Some("Ana"), Some("Bruno"), Some("Óscar"), None, None]
        );
        let desc = sort_by(&rows(), "name", SortDirection::Desc);
        assert_eq!(
            names(&desc),
            vec![Some("Óscar"), Some("Bruno"), Some("Ana"), Some("ana"), Some("álvaro"), None, None]
        );
    }

    #[test]
    fn numbers_sort_numerically_and_stably() {
        let sorted = sort_by(&rows(), "value", SortDirection::Asc);
        let tags: Vec<usize> = sorted.iter().map(|r| r.tag).collect();
        // 1.0, 2.0 (tag 4 before tag 5), 3.0, 10.0, then nulls in input order
        assert_eq!(tags, vec![1, 4, 5, 0, 3, 2, 6]);
    }

    #[test]
    fn sorting_is_idempotent() {
        let once = sort_by(&rows(), "name", SortDirection::Asc);
        assert_eq!(sort_by(&once, "name", SortDirection::Asc), once);
    }

    #[test]
    fn desc_reverses_asc_on_distinct_non_null_keys() {
        let data: Vec<Row> = rows().into_iter().filter(|r| r.value.is_some() && r.tag != 5).collect();
        let mut asc = sort_by(&data, "value", SortDirection::Asc);
        asc.reverse();
        assert_eq!(sort_by(&data, "value", SortDirection::Desc), asc);
    }

    #[test]
    fn toggle_cycles_asc_desc_off() {
        let original = rows();
        let mut state = SortState::default();
        state.toggle("name");
        assert_eq!(state.direction, Some(SortDirection::Asc));
        state.toggle("name");
        assert_eq!(state.direction, Some(SortDirection::Desc));
        state.toggle("name");
        assert_eq!(state, SortState::default());
        assert_eq!(state.apply(&original), original);

        state.toggle("name");
        state.toggle("value");
        assert_eq!(state, SortState::new("value", SortDirection::Asc));
    }

    #[test]
    fn pages_concatenate_to_input() {
        let data: Vec<usize> = (0..23).collect();
        let total = total_pages(data.len(), DEFAULT_PAGE_SIZE);
        assert_eq!(total, 3);
        let joined: Vec<usize> = (1..=total)
            .flat_map(|p| paginate(&data, DEFAULT_PAGE_SIZE, p).items)
            .collect();
        assert_eq!(joined, data);

        let last = paginate(&data, DEFAULT_PAGE_SIZE, 3);
        assert_eq!(last.range, (21, 23));
        assert!(!last.has_next());
    }

    #[test]
    fn total_pages_is_ceiling() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        let empty = paginate::<u8>(&[], 10, 4);
        assert_eq!(empty.current, 1);
        assert_eq!(empty.range, (0, 0));
    }

    #[test]
    fn window_shape() {
        use PageItem::{Ellipsis, Page as P};
        assert_eq!(page_window(2, 4), vec![P(1), P(2), P(3), P(4)]);
        assert_eq!(page_window(1, 10), vec![P(1), P(2), Ellipsis, P(10)]);
        assert_eq!(
            page_window(5, 10),
            vec![P(1), Ellipsis, P(4), P(5), P(6), Ellipsis, P(10)]
        );
        assert_eq!(page_window(10, 10), vec![P(1), Ellipsis, P(9), P(10)]);
    }

    #[test]
    fn paginator_clamps() {
        let mut pager = Paginator::default();
        pager.previous(35);
        assert_eq!(pager.current(), 1);
        pager.go_to(99, 35);
        assert_eq!(pager.current(), 4);
        pager.next(35);
        assert_eq!(pager.current(), 4);
    }

    #[test]
    fn changing_sort_returns_to_first_page() {
        let data: Vec<Row> = (0..25)
            .map(|tag| Row {
                name: None,
                value: Some(tag as f64),
                tag,
            })
            .collect();
        let mut view = TableView::default();
        view.pager.go_to(3, data.len());
        assert_eq!(view.render(&data).current, 3);

        view.toggle_sort("value");
        let page = view.render(&data);
        assert_eq!(page.current, 1);
        assert_eq!(page.items[0].tag, 0);

        view.pager.next(data.len());
        view.toggle_sort("value");
        let page = view.render(&data);
        assert_eq!(page.current, 1);
        assert_eq!(page.items[0].tag, 24);
    }
}
