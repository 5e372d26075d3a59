use std::sync::Arc;

use chimera_autoconfigure::prelude::*;
use chimera_autoconfigure::JTA_TRANSACTION_MANAGER_JNDI_NAMES;

// ==================== 子上下文候选（编译期声明） ====================

submit_candidate!(|| {
    // 父上下文已有事务管理器时不再创建
    Candidate::factory("childTransactionManager", "PlatformTransactionManager")
        .with_condition(Condition::jndi(JTA_TRANSACTION_MANAGER_JNDI_NAMES.iter().copied()))
        .with_condition(Condition::bean_absent(BeanSearch::deduced()))
});

submit_candidate!(|| {
    Candidate::factory("jmsListenerContainerFactory", "JmsListenerContainerFactory").with_condition(
        Condition::bean_present(
            BeanSearch::of_type("org.springframework.jms.core.JmsTemplate")
                .with_scope(SearchScope::Parents),
        ),
    )
});

submit_candidate!(10, || {
    Candidate::for_type("web.DispatcherServlet")
        .with_condition(Condition::WebApplication)
        .with_condition(Condition::custom("OnProfile(web)", |ctx| {
            let profiles = ctx.facts().environment().get_active_profiles();
            Ok(ConditionOutcome {
                matched: profiles.iter().any(|p| p == "web"),
                message: format!("active profiles {:?}", profiles),
            })
        }))
});

// ==================== 主程序 ====================

fn main() -> Result<()> {
    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║   Chimera Auto-Configuration - Demo               ║");
    println!("╚════════════════════════════════════════════════════╝\n");

    // 查找配置文件
    let base_dirs = ["demos/autoconfigure-demo", "."];
    let base_dir = base_dirs
        .iter()
        .find(|dir| std::path::Path::new(dir).join("candidates.toml").exists())
        .copied()
        .unwrap_or(".");
    let config_file = format!("{}/application.toml", base_dir);
    let manifest = format!("{}/candidates.toml", base_dir);

    // 根上下文：候选来自 TOML 清单，类路径事实来自清单的 classpath
    let root = AutoConfigurationApplication::new("RootContext")
        .config_file(config_file.clone())
        .manifest(manifest)
        .jndi_resolver(StaticJndiContext::new().with_binding("java:comp/TransactionManager", "jta"))
        .listener(Arc::new(LoggingResolutionListener::new()))
        .run()?;

    // 子上下文：候选来自 submit_candidate! 声明，父 Fact Store 只读
    let child = AutoConfigurationApplication::new("WebContext")
        .init_logging(false)
        .config_file(config_file)
        .profiles(vec!["web".to_string()])
        .web_application(true)
        .jndi_resolver(StaticJndiContext::new().with_binding("java:comp/TransactionManager", "jta"))
        .parent(Arc::clone(root.facts()))
        .run()?;
    tracing::info!(
        "Child context resolved against parent with {} registration(s)",
        root.facts().registrations().len()
    );

    for (name, resolution) in [("RootContext", &root), ("WebContext", &child)] {
        println!("\n📦 {}:", name);
        for (id, outcome) in resolution.activations().iter() {
            println!("   {:<32} {}", id, outcome);
        }
    }

    println!("\n{}", child.report(ReportMode::Summary));
    println!("{}", report::render_json(child.trace())?);

    Ok(())
}
