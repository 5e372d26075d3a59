//! Fact Store - 条件评估所依赖的事实
//!
//! 类路径、属性、JNDI 事实在一次解析中是固定输入；
//! 只有"已存在的注册"这一面会随着候选激活而增长。

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::candidate::Candidate;
use crate::config::{ConfigValue, Environment, MapPropertySource};
use crate::utils::naming;

/// 类路径事实的提供者
///
/// 实现必须没有副作用，对任意字符串都只返回 true/false
pub trait ClassResolver: Send + Sync {
    fn is_class_present(&self, name: &str) -> bool;
}

impl<F> ClassResolver for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_class_present(&self, name: &str) -> bool {
        self(name)
    }
}

/// 静态类清单（编译期或配置文件中给出的类名集合）
#[derive(Debug, Clone, Default)]
pub struct StaticClassManifest {
    classes: HashSet<String>,
}

impl StaticClassManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.classes.insert(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassResolver for StaticClassManifest {
    fn is_class_present(&self, name: &str) -> bool {
        self.classes.contains(name)
    }
}

/// 命名服务（JNDI）的提供者
pub trait JndiResolver: Send + Sync {
    /// 查找名称，返回绑定的对象描述
    fn lookup(&self, name: &str) -> Option<String>;
}

/// 内存中的命名上下文
#[derive(Debug, Clone, Default)]
pub struct StaticJndiContext {
    bindings: HashMap<String, String>,
}

impl StaticJndiContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }
}

impl JndiResolver for StaticJndiContext {
    fn lookup(&self, name: &str) -> Option<String> {
        self.bindings.get(name).cloned()
    }
}

/// 应用类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationKind {
    Standard,
    Web,
}

impl Default for ApplicationKind {
    fn default() -> Self {
        ApplicationKind::Standard
    }
}

/// 注册来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationSource {
    /// 解析开始前宿主容器已有的注册
    Initial,
    /// 本次解析中激活的候选
    Candidate,
}

/// 一条 Bean 注册事实
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeanRegistration {
    pub name: String,
    pub types: Vec<String>,
    pub source: RegistrationSource,
}

/// 类型层级及其可赋值性缓存
///
/// 缓存归属于层级本身，层级变化时清空
#[derive(Debug, Default)]
pub struct TypeHierarchy {
    supertypes: HashMap<String, Vec<String>>,
    assignable_cache: RwLock<HashMap<(String, String), bool>>,
}

impl Clone for TypeHierarchy {
    fn clone(&self) -> Self {
        Self {
            supertypes: self.supertypes.clone(),
            assignable_cache: RwLock::new(self.assignable_cache.read().clone()),
        }
    }
}

impl TypeHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明类型的直接父类型（接口或基类）
    pub fn declare<I, S>(&mut self, type_name: impl Into<String>, supertypes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supertypes
            .entry(type_name.into())
            .or_default()
            .extend(supertypes.into_iter().map(Into::into));
        self.assignable_cache.get_mut().clear();
    }

    /// `source` 类型的实例能否作为 `target` 类型使用
    pub fn is_assignable(&self, source: &str, target: &str) -> bool {
        if source == target {
            return true;
        }

        let key = (source.to_string(), target.to_string());
        if let Some(cached) = self.assignable_cache.read().get(&key) {
            return *cached;
        }

        let assignable = self.search_supertypes(source, target);
        self.assignable_cache.write().insert(key, assignable);
        assignable
    }

    fn search_supertypes(&self, source: &str, target: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([source]);

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for parent in self.supertypes.get(current).into_iter().flatten() {
                if parent == target {
                    return true;
                }
                queue.push_back(parent);
            }
        }
        false
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.assignable_cache.read().len()
    }
}

/// Fact Store
///
/// 一个解析器实例独占一个 Fact Store；解析结束后以 `Arc` 冻结，
/// 可作为子上下文的父 Fact Store（只读）。
#[derive(Clone)]
pub struct FactStore {
    classes: Arc<dyn ClassResolver>,
    environment: Arc<Environment>,
    jndi: Option<Arc<dyn JndiResolver>>,
    hierarchy: TypeHierarchy,
    registrations: Vec<BeanRegistration>,
    application_kind: ApplicationKind,
    parent: Option<Arc<FactStore>>,
}

impl std::fmt::Debug for FactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactStore")
            .field("registrations", &self.registrations)
            .field("application_kind", &self.application_kind)
            .field("jndi_available", &self.jndi.is_some())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl FactStore {
    /// 构建器模式创建 Fact Store
    pub fn builder() -> FactStoreBuilder {
        FactStoreBuilder::new()
    }

    /// 类是否可解析
    ///
    /// 格式错误或未知的类名视为不存在，不会报错
    pub fn class_resolvable(&self, name: &str) -> bool {
        if !naming::is_well_formed_type_name(name) {
            tracing::trace!("Malformed class name '{}' treated as absent", name);
            return false;
        }
        let present = self.classes.is_class_present(name);
        tracing::trace!("Class '{}' resolvable: {}", name, present);
        present
    }

    /// 属性值
    pub fn property_value(&self, key: &str) -> Option<String> {
        self.environment.property_value(key)
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 命名服务是否可用
    pub fn jndi_available(&self) -> bool {
        self.jndi.is_some()
    }

    /// 返回第一个可解析的 JNDI 名称
    ///
    /// 命名服务不存在时视为没有任何名称可解析
    pub fn jndi_resolvable<S: AsRef<str>>(&self, names: &[S]) -> Option<String> {
        let jndi = self.jndi.as_ref()?;
        names
            .iter()
            .map(AsRef::as_ref)
            .find(|name| jndi.lookup(name).is_some())
            .map(String::from)
    }

    pub fn application_kind(&self) -> ApplicationKind {
        self.application_kind
    }

    pub fn hierarchy(&self) -> &TypeHierarchy {
        &self.hierarchy
    }

    pub fn parent(&self) -> Option<&Arc<FactStore>> {
        self.parent.as_ref()
    }

    /// 本地注册（按注册顺序）
    pub fn registrations(&self) -> &[BeanRegistration] {
        &self.registrations
    }

    /// 指定类型（含可赋值类型）的 Bean 名称
    pub fn bean_names_for_type(&self, type_name: &str, consider_hierarchy: bool) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self
            .registrations
            .iter()
            .filter(|registration| {
                registration
                    .types
                    .iter()
                    .any(|t| self.hierarchy.is_assignable(t, type_name))
            })
            .map(|registration| registration.name.clone())
            .collect();

        if consider_hierarchy {
            if let Some(parent) = &self.parent {
                names.extend(parent.bean_names_for_type(type_name, true));
            }
        }
        names
    }

    /// 是否包含指定名称的 Bean
    pub fn contains_bean(&self, name: &str, consider_hierarchy: bool) -> bool {
        if self.registrations.iter().any(|r| r.name == name) {
            return true;
        }
        consider_hierarchy
            && self
                .parent
                .as_ref()
                .is_some_and(|parent| parent.contains_bean(name, true))
    }

    /// 记录候选激活，之后评估的候选可以看到其名称和类型
    pub(crate) fn record_activation(&mut self, candidate: &Candidate) {
        let registration = BeanRegistration {
            name: candidate.id().to_string(),
            types: candidate.registered_types(),
            source: RegistrationSource::Candidate,
        };
        tracing::trace!(
            "Recording activation of '{}' with types {:?}",
            registration.name,
            registration.types
        );
        self.registrations.push(registration);
    }

    /// 冻结 Fact Store，供子上下文只读使用
    pub fn freeze(self) -> Arc<FactStore> {
        Arc::new(self)
    }
}

/// Fact Store 构建器
pub struct FactStoreBuilder {
    classes: Option<Arc<dyn ClassResolver>>,
    environment: Option<Arc<Environment>>,
    inline_properties: MapPropertySource,
    jndi: Option<Arc<dyn JndiResolver>>,
    hierarchy: TypeHierarchy,
    registrations: Vec<BeanRegistration>,
    application_kind: ApplicationKind,
    parent: Option<Arc<FactStore>>,
}

impl FactStoreBuilder {
    pub fn new() -> Self {
        Self {
            classes: None,
            environment: None,
            inline_properties: MapPropertySource::new("inlineFacts").with_priority(1000),
            jndi: None,
            hierarchy: TypeHierarchy::new(),
            registrations: Vec::new(),
            application_kind: ApplicationKind::default(),
            parent: None,
        }
    }

    /// 设置类路径事实提供者
    pub fn class_resolver(mut self, resolver: impl ClassResolver + 'static) -> Self {
        self.classes = Some(Arc::new(resolver));
        self
    }

    /// 共享已有的类路径事实提供者
    pub fn shared_class_resolver(mut self, resolver: Arc<dyn ClassResolver>) -> Self {
        self.classes = Some(resolver);
        self
    }

    /// 使用静态类清单
    pub fn classes<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_resolver(StaticClassManifest::from_names(names))
    }

    /// 设置属性事实（Environment）
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// 直接设置单个属性（优先级高于 Environment 中的其它配置源）
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.inline_properties = self
            .inline_properties
            .with_property(key, ConfigValue::String(value.into()));
        self
    }

    /// 设置命名服务
    pub fn jndi_resolver(mut self, resolver: impl JndiResolver + 'static) -> Self {
        self.jndi = Some(Arc::new(resolver));
        self
    }

    pub fn shared_jndi_resolver(mut self, resolver: Arc<dyn JndiResolver>) -> Self {
        self.jndi = Some(resolver);
        self
    }

    /// 声明类型层级
    pub fn supertypes<I, S>(mut self, type_name: impl Into<String>, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hierarchy.declare(type_name, supertypes);
        self
    }

    /// 添加解析开始前已存在的 Bean 注册
    pub fn bean<I, S>(mut self, name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registrations.push(BeanRegistration {
            name: name.into(),
            types: types.into_iter().map(Into::into).collect(),
            source: RegistrationSource::Initial,
        });
        self
    }

    pub fn web_application(mut self, web: bool) -> Self {
        self.application_kind = if web {
            ApplicationKind::Web
        } else {
            ApplicationKind::Standard
        };
        self
    }

    /// 设置父 Fact Store（必须已冻结）
    pub fn parent(mut self, parent: Arc<FactStore>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn build(self) -> FactStore {
        let mut environment = self
            .environment
            .unwrap_or_else(|| Arc::new(Environment::new()));
        // 传入的 Environment 可能被其它 Fact Store 共享，内联属性放在新的一层
        if !self.inline_properties.is_empty() {
            let layered = Environment::layered_over(environment);
            layered.add_property_source(Box::new(self.inline_properties));
            environment = Arc::new(layered);
        }

        FactStore {
            classes: self
                .classes
                .unwrap_or_else(|| Arc::new(StaticClassManifest::new())),
            environment,
            jndi: self.jndi,
            hierarchy: self.hierarchy,
            registrations: self.registrations,
            application_kind: self.application_kind,
            parent: self.parent,
        }
    }
}

impl Default for FactStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
