use crate::api::BackupApi;
use crate::models::{EnvironmentId, InstanceCatalog, Provider};
use crate::notify::{Notification, Notifier};
use std::collections::HashSet;
use tracing::{error, info};

/// 各云厂商的环境清单，会话内固定
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentRegistry {
    aliyun: Vec<EnvironmentId>,
    aws: Vec<EnvironmentId>,
}

impl EnvironmentRegistry {
    /// 从静态配置构造，重复项保留首次出现的位置
    pub fn from_static<A, B>(aliyun: A, aws: B) -> Self
    where
        A: IntoIterator,
        A::Item: Into<EnvironmentId>,
        B: IntoIterator,
        B::Item: Into<EnvironmentId>,
    {
        Self {
            aliyun: dedup(aliyun.into_iter().map(Into::into)),
            aws: dedup(aws.into_iter().map(Into::into)),
        }
    }

    pub fn from_catalog(catalog: InstanceCatalog) -> Self {
        Self::from_static(catalog.aliyun, catalog.aws)
    }

    /// 从后端加载，只请求一次
    ///
    /// 失败时清单为空并给出一条错误提示，不重试。
    pub async fn load(api: &dyn BackupApi, notifier: &dyn Notifier) -> Self {
        match api.list_instances().await {
            Ok(catalog) => {
                let registry = Self::from_catalog(catalog);
                info!(
                    aliyun = registry.aliyun.len(),
                    aws = registry.aws.len(),
                    "实例配置加载完成"
                );
                registry
            }
            Err(e) => {
                error!("获取实例配置失败: {}", e);
                notifier.notify(Notification::error(format!(
                    "获取实例配置失败：{}",
                    e.reason()
                )));
                Self::default()
            }
        }
    }

    pub fn list(&self, provider: Provider) -> &[EnvironmentId] {
        match provider {
            Provider::Aliyun => &self.aliyun,
            Provider::Aws => &self.aws,
        }
    }

    pub fn contains(&self, provider: Provider, env: &EnvironmentId) -> bool {
        self.list(provider).contains(env)
    }

    pub fn is_empty(&self) -> bool {
        self.aliyun.is_empty() && self.aws.is_empty()
    }
}

fn dedup(envs: impl Iterator<Item = EnvironmentId>) -> Vec<EnvironmentId> {
    let mut seen = HashSet::new();
    envs.filter(|env| seen.insert(env.clone())).collect()
}
