//! 表格视图：搜索、筛选、排序、分页
//!
//! 全部是纯函数，不修改原始记录列表。

use crate::constants::view::{DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};
use crate::models::{BackupRecord, EnvironmentId, SnapshotRecord};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// 排序依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey<'a> {
    Text(&'a str),
    /// 毫秒时间戳，缺失或无法解析时为 None
    Time(Option<i64>),
}

/// 可展示在表格中的记录
pub trait TableRow {
    type Column: Copy + fmt::Debug;

    fn env(&self) -> &EnvironmentId;
    fn sort_key(&self, column: Self::Column) -> SortKey<'_>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliColumn {
    Env,
    BackupStartTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwsColumn {
    Env,
    SnapshotId,
    CreateTime,
    Status,
}

impl FromStr for AliColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "time" | "backup_start_time" => Ok(Self::BackupStartTime),
            other => Err(format!("不支持的排序列: {other}（可选: env, time）")),
        }
    }
}

impl FromStr for AwsColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "snapshot" | "snapshot_id" => Ok(Self::SnapshotId),
            "time" | "create_time" => Ok(Self::CreateTime),
            "status" => Ok(Self::Status),
            other => Err(format!(
                "不支持的排序列: {other}（可选: env, snapshot, time, status）"
            )),
        }
    }
}

impl TableRow for BackupRecord {
    type Column = AliColumn;

    fn env(&self) -> &EnvironmentId {
        &self.env
    }

    fn sort_key(&self, column: AliColumn) -> SortKey<'_> {
        match column {
            AliColumn::Env => SortKey::Text(self.env.as_str()),
            AliColumn::BackupStartTime => SortKey::Time(
                self.backup_start_time
                    .as_ref()
                    .and_then(|t| t.epoch_millis()),
            ),
        }
    }
}

impl TableRow for SnapshotRecord {
    type Column = AwsColumn;

    fn env(&self) -> &EnvironmentId {
        &self.env
    }

    fn sort_key(&self, column: AwsColumn) -> SortKey<'_> {
        match column {
            AwsColumn::Env => SortKey::Text(self.env.as_str()),
            AwsColumn::SnapshotId => SortKey::Text(&self.snapshot_id),
            AwsColumn::CreateTime => {
                SortKey::Time(self.create_time.as_ref().and_then(|t| t.epoch_millis()))
            }
            AwsColumn::Status => SortKey::Text(self.status.as_str()),
        }
    }
}

/// 按环境名做不区分大小写的子串匹配，保持原有顺序
///
/// 搜索文本原样参与匹配，只有空串表示不筛选。
pub fn project<R: TableRow + Clone>(records: &[R], search: &str) -> Vec<R> {
    if search.is_empty() {
        return records.to_vec();
    }
    let needle = search.to_lowercase();
    records
        .iter()
        .filter(|r| r.env().as_str().to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// 环境列精确筛选，空集合表示不筛选
pub fn filter_envs<R: TableRow>(records: Vec<R>, envs: &BTreeSet<EnvironmentId>) -> Vec<R> {
    if envs.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| envs.contains(r.env()))
        .collect()
}

fn compare_keys(a: SortKey<'_>, b: SortKey<'_>, order: SortOrder) -> Ordering {
    let directed = |ord: Ordering| match order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    };
    match (a, b) {
        (SortKey::Text(a), SortKey::Text(b)) => directed(a.cmp(b)),
        // 缺失的时间无论升降序都排在最后
        (SortKey::Time(Some(a)), SortKey::Time(Some(b))) => directed(a.cmp(&b)),
        (SortKey::Time(None), SortKey::Time(Some(_))) => Ordering::Greater,
        (SortKey::Time(Some(_)), SortKey::Time(None)) => Ordering::Less,
        (SortKey::Time(None), SortKey::Time(None)) => Ordering::Equal,
        (SortKey::Text(_), SortKey::Time(_)) | (SortKey::Time(_), SortKey::Text(_)) => {
            Ordering::Equal
        }
    }
}

/// 稳定排序
pub fn sort_rows<R: TableRow>(rows: &mut [R], column: R::Column, order: SortOrder) {
    rows.sort_by(|a, b| compare_keys(a.sort_key(column), b.sort_key(column), order));
}

/// 表格查询条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery<C> {
    pub search: String,
    pub envs: BTreeSet<EnvironmentId>,
    pub sort: Option<(C, SortOrder)>,
    /// 从 1 开始
    pub page: usize,
    pub page_size: usize,
}

impl<C> Default for ViewQuery<C> {
    fn default() -> Self {
        Self {
            search: String::new(),
            envs: BTreeSet::new(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewQuery<AliColumn> {
    /// 阿里云表默认按备份时间降序
    pub fn aliyun() -> Self {
        Self {
            sort: Some((AliColumn::BackupStartTime, SortOrder::Descending)),
            ..Self::default()
        }
    }
}

impl ViewQuery<AwsColumn> {
    pub fn aws() -> Self {
        Self::default()
    }
}

impl<C> ViewQuery<C> {
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_sort(mut self, column: C, order: SortOrder) -> Self {
        self.sort = Some((column, order));
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }
}

/// 是否为界面提供的分页大小之一
pub fn is_standard_page_size(size: usize) -> bool {
    PAGE_SIZE_OPTIONS.contains(&size)
}

/// 当前页数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView<R> {
    pub rows: Vec<R>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
}

impl<R> TableView<R> {
    pub fn total_label(&self) -> String {
        format!("共 {} 条记录", self.total)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl<R: TableRow + Clone> TableView<R> {
    /// 依次执行搜索、筛选、排序、分页；页码越界时钳制到有效范围
    pub fn build(records: &[R], query: &ViewQuery<R::Column>) -> Self {
        let mut rows = filter_envs(project(records, &query.search), &query.envs);
        if let Some((column, order)) = query.sort {
            sort_rows(&mut rows, column, order);
        }

        let total = rows.len();
        let page_size = if query.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.page_size
        };
        let page_count = total.div_ceil(page_size).max(1);
        let page = query.page.clamp(1, page_count);

        let rows = rows
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Self {
            rows,
            total,
            page,
            page_size,
            page_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{backup, snapshot};

    fn envs(rows: &[BackupRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.env.as_str()).collect()
    }

    #[test]
    fn test_project_is_case_insensitive_and_ordered() {
        let records = vec![
            backup("Prod-CN", None, None),
            backup("staging", None, None),
            backup("prod-us", None, None),
        ];

        assert_eq!(project(&records, ""), records);
        assert_eq!(envs(&project(&records, "PROD")), vec!["Prod-CN", "prod-us"]);
        assert!(project(&records, "qa").is_empty());
    }

    #[test]
    fn test_project_does_not_trim_search_text() {
        let records = vec![backup("prod-us", None, None), backup("qa", None, None)];

        assert!(project(&records, "prod ").is_empty());
        assert!(project(&records, " ").is_empty());
        assert_eq!(envs(&project(&records, "-US")), vec!["prod-us"]);
    }

    #[test]
    fn test_missing_times_sort_last_both_ways() {
        let mut rows = vec![
            backup("a", None, Some("2024-03-20T10:00:00Z")),
            backup("b", None, None),
            backup("c", None, Some("2024-03-21T10:00:00Z")),
            backup("d", None, Some("garbage")),
        ];

        sort_rows(&mut rows, AliColumn::BackupStartTime, SortOrder::Ascending);
        assert_eq!(envs(&rows), vec!["a", "c", "b", "d"]);

        sort_rows(&mut rows, AliColumn::BackupStartTime, SortOrder::Descending);
        assert_eq!(envs(&rows), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut rows = vec![
            snapshot("x", "available", None),
            snapshot("y", "creating", None),
            snapshot("z", "available", None),
        ];
        sort_rows(&mut rows, AwsColumn::Status, SortOrder::Ascending);
        let ids: Vec<_> = rows.iter().map(|r| r.env.as_str()).collect();
        assert_eq!(ids, vec!["x", "z", "y"]);
    }

    #[test]
    fn test_env_filter_is_exact() {
        let records = vec![backup("prod", None, None), backup("prod-2", None, None)];
        let selected = BTreeSet::from([EnvironmentId::from("prod")]);
        assert_eq!(envs(&filter_envs(records, &selected)), vec!["prod"]);
    }

    #[test]
    fn test_pagination_and_total_label() {
        let records: Vec<_> = (0..23)
            .map(|i| backup(&format!("env-{i:02}"), None, None))
            .collect();

        let query = ViewQuery::<AliColumn>::default()
            .with_sort(AliColumn::Env, SortOrder::Ascending)
            .with_page(3, 10);
        let view = TableView::build(&records, &query);
        assert_eq!(view.total_label(), "共 23 条记录");
        assert_eq!(view.page_count, 3);
        assert_eq!(envs(&view.rows), vec!["env-20", "env-21", "env-22"]);

        let view = TableView::build(&records, &query.clone().with_page(9, 50));
        assert_eq!(view.page, 1);
        assert_eq!(view.rows.len(), 23);
    }

    #[test]
    fn test_aliyun_default_query_sorts_newest_first() {
        let records = vec![
            backup("old", None, Some("2024-01-01 00:00:00")),
            backup("none", None, None),
            backup("new", None, Some("2024-06-01 00:00:00")),
        ];
        let view = TableView::build(&records, &ViewQuery::aliyun());
        assert_eq!(envs(&view.rows), vec!["new", "old", "none"]);
        assert!(is_standard_page_size(view.page_size));
    }

    #[test]
    fn test_empty_view() {
        let view = TableView::<SnapshotRecord>::build(&[], &ViewQuery::aws());
        assert!(view.is_empty());
        assert_eq!(view.page, 1);
        assert_eq!(view.total_label(), "共 0 条记录");
    }
}
