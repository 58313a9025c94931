use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use propdesc_editor::io::{AssumeYes, FileRecordStore, PropDescExporter, StdinPrompt};
use propdesc_editor::datatypes::ConditionOperation;
use propdesc_editor::record::fields;
use propdesc_editor::{ConfirmPrompt, EditorConfig, InstallOutcome, Namespace, PropertySession};

type Session = PropertySession<FileRecordStore>;

#[derive(Parser)]
#[command(name = "propdesc_editor")]
#[command(about = "编辑、比较、安装点分名称属性描述")]
#[command(version)]
struct Cli {
    /// 配置文件路径
    #[arg(long, global = true, default_value = "propdesc_editor.json")]
    config: PathBuf,

    /// 数据目录（覆盖配置文件）
    #[arg(long, global = true)]
    data_folder: Option<PathBuf>,

    /// 详细日志
    #[arg(short, long, global = true)]
    verbose: bool,

    /// 静默模式(仅输出错误)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// 所有确认都回答“是”
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 显示名称树
    Tree {
        /// 显示已安装命名空间（默认显示已保存）
        #[arg(long)]
        installed: bool,
    },
    /// 显示一条记录的全部字段
    Show {
        name: String,
        #[arg(long)]
        installed: bool,
    },
    /// 校验属性名
    Validate { name: String },
    /// 新建并保存记录
    New {
        name: String,
        /// 字段赋值，格式 Field=Value，可重复
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        /// 保存后立即安装
        #[arg(long)]
        install: bool,
    },
    /// 修改已保存记录并保存（只安装过的记录与已安装名称冲突，不能保存，可用 diff 查看）
    Edit {
        name: String,
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        /// 与已安装版本比较
        #[arg(long)]
        compare_installed: bool,
    },
    /// 显示修改后与基线的差异，不保存
    Diff {
        name: String,
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long)]
        compare_installed: bool,
    },
    /// 安装记录或节点下的全部记录
    Install { name: String },
    /// 卸载记录或节点下的全部记录
    Uninstall { name: String },
    /// 删除已保存记录或节点下的全部记录
    Delete { name: String },
    /// 导出为 propdesc 文件
    Export {
        name: String,
        #[arg(long)]
        installed: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = EditorConfig::load(&cli.config)
        .with_context(|| format!("读取配置文件失败: {}", cli.config.display()))?;
    if let Some(folder) = &cli.data_folder {
        config.data_folder = Some(folder.clone());
    }

    let folder = config
        .data_folder
        .clone()
        .context("未配置数据目录，请使用 --data-folder 或在配置文件中设置 data_folder")?;
    let store = FileRecordStore::open(&folder)
        .with_context(|| format!("打开数据目录失败: {}", folder.display()))?;
    let mut session = PropertySession::open(config, store).context("加载属性失败")?;

    let prompt: Box<dyn ConfirmPrompt> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinPrompt)
    };

    match &cli.command {
        Command::Tree { installed } => {
            print!("{}", session.index(namespace_of(*installed)).outline());
            Ok(())
        }
        Command::Show { name, installed } => handle_show(&session, name, *installed),
        Command::Validate { name } => match session.validate_name(name) {
            Some(error) => bail!("{}: {}", name, error),
            None => {
                println!("{}: valid", name);
                Ok(())
            }
        },
        Command::New { name, set, install } => {
            handle_new(&cli, &mut session, name, set, *install, prompt.as_ref())
        }
        Command::Edit {
            name,
            set,
            compare_installed,
        } => handle_edit(&cli, &mut session, name, set, *compare_installed, true, prompt.as_ref()),
        Command::Diff {
            name,
            set,
            compare_installed,
        } => handle_edit(&cli, &mut session, name, set, *compare_installed, false, prompt.as_ref()),
        Command::Install { name } => handle_install(&cli, &mut session, name, prompt.as_ref()),
        Command::Uninstall { name } => handle_uninstall(&cli, &mut session, name),
        Command::Delete { name } => handle_delete(&cli, &mut session, name, prompt.as_ref()),
        Command::Export { name, installed } => handle_export(&cli, &session, name, *installed),
    }
}

/// 初始化日志：默认 warn，--verbose 为 debug，--quiet 只输出错误
fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 解析 Field=Value
fn parse_assignment(text: &str) -> std::result::Result<(String, String), String> {
    let (field, value) = text
        .split_once('=')
        .ok_or_else(|| format!("期望 Field=Value，实际为 {}", text))?;
    Ok((field.trim().to_string(), value.to_string()))
}

fn namespace_of(installed: bool) -> Namespace {
    if installed {
        Namespace::Installed
    } else {
        Namespace::Saved
    }
}

fn handle_show(session: &Session, name: &str, installed: bool) -> Result<()> {
    let record = session
        .index(namespace_of(installed))
        .record(name)
        .with_context(|| format!("没有找到属性: {}", name))?;

    for spec in fields::FIELDS {
        println!("{:<24} {}", spec.id.name(), (spec.render)(record));
    }
    if installed {
        println!("{:<24} {}", "IsSystemProperty", record.is_system_property);
        println!(
            "{:<24} {} ({})",
            "ConditionOperation*",
            record.condition_operation_installed,
            ConditionOperation::from_installed(record.condition_operation_installed)
        );
        println!("{:<24} {}", "ViewFlags", record.view_flags);
    }
    Ok(())
}

fn apply_assignments(session: &mut Session, set: &[(String, String)]) -> Result<()> {
    for (field, value) in set {
        session
            .set_field(field, value)
            .with_context(|| format!("无法设置 {} = {}", field, value))?;
    }
    Ok(())
}

fn handle_new(
    cli: &Cli,
    session: &mut Session,
    name: &str,
    set: &[(String, String)],
    install: bool,
    prompt: &dyn ConfirmPrompt,
) -> Result<()> {
    if let Some(error) = session.validate_name(name) {
        bail!("{}: {}", name, error);
    }
    if session.saved().contains(name) {
        bail!("{} 已存在，请使用 edit", name);
    }

    session.new_draft(name, prompt);
    apply_assignments(session, set)?;

    if install {
        let outcome = session.install_draft()?;
        report_outcome(cli, name, &outcome)?;
    } else {
        let record = session.save_draft()?;
        if !cli.quiet {
            println!("已保存 {} ({})", name, record.schema_key);
        }
    }
    Ok(())
}

fn handle_edit(
    cli: &Cli,
    session: &mut Session,
    name: &str,
    set: &[(String, String)],
    compare_installed: bool,
    save: bool,
    prompt: &dyn ConfirmPrompt,
) -> Result<()> {
    if save && !session.saved().contains(name) {
        if let Some(error) = session.validate_name(name) {
            bail!("{}: {}", name, error);
        }
    }

    if session.installed().contains(name) {
        session.select_name(Namespace::Installed, name, prompt)?;
    }

    if session.saved().contains(name) {
        session.select_name(Namespace::Saved, name, prompt)?;
    } else if session.installed().contains(name) {
        session.copy_installed_to_editor(prompt);
    } else {
        bail!("没有找到属性: {}", name);
    }

    session.set_compare_installed(compare_installed);
    apply_assignments(session, set)?;

    if !cli.quiet {
        println!("{}", session.report());
    }

    if save {
        if session.is_dirty() || !session.saved().contains(name) {
            let record = session.save_draft()?;
            if !cli.quiet {
                println!("已保存 {} ({})", name, record.schema_key);
            }
        } else if !cli.quiet {
            println!("没有需要保存的修改");
        }
    }
    Ok(())
}

fn report_outcome(cli: &Cli, name: &str, outcome: &InstallOutcome) -> Result<()> {
    match outcome {
        InstallOutcome::Failure(reason) => bail!("{}: {}", name, reason),
        _ => {
            if !cli.quiet {
                println!("{}: {}", name, outcome);
            }
            Ok(())
        }
    }
}

fn handle_install(cli: &Cli, session: &mut Session, name: &str, prompt: &dyn ConfirmPrompt) -> Result<()> {
    let node = session
        .node_for(Namespace::Saved, name)
        .with_context(|| format!("没有找到已保存的属性: {}", name))?;

    if session.select_node(Namespace::Saved, node, prompt) {
        let outcome = session.install_draft()?;
        return report_outcome(cli, name, &outcome);
    }

    let report = session.install_node(node);
    print_bulk(cli, "安装", &report.messages, &report.to_string());
    if report.failed > 0 {
        bail!("{} 个属性安装失败", report.failed);
    }
    Ok(())
}

fn handle_uninstall(cli: &Cli, session: &mut Session, name: &str) -> Result<()> {
    if session.saved().contains(name) {
        if !session.uninstall_record(name)? {
            bail!("{}: 宿主没有移除该属性", name);
        }
        if !cli.quiet {
            println!("已卸载 {}", name);
        }
        return Ok(());
    }

    let node = session
        .node_for(Namespace::Saved, name)
        .with_context(|| format!("没有找到已保存的属性: {}", name))?;
    let report = session.uninstall_node(Namespace::Saved, node);
    print_bulk(cli, "卸载", &report.messages, &report.to_string());
    if report.failed > 0 {
        bail!("{} 个属性卸载失败", report.failed);
    }
    Ok(())
}

fn handle_delete(cli: &Cli, session: &mut Session, name: &str, prompt: &dyn ConfirmPrompt) -> Result<()> {
    let node = session
        .node_for(Namespace::Saved, name)
        .with_context(|| format!("没有找到已保存的属性: {}", name))?;

    if session.select_node(Namespace::Saved, node, prompt) {
        session.delete_draft()?;
        if !cli.quiet {
            println!("已删除 {}", name);
        }
        return Ok(());
    }

    let report = session.delete_node(node);
    print_bulk(cli, "删除", &report.messages, &report.to_string());
    if report.failed > 0 {
        bail!("{} 个属性删除失败", report.failed);
    }
    Ok(())
}

fn handle_export(cli: &Cli, session: &Session, name: &str, installed: bool) -> Result<()> {
    let namespace = namespace_of(installed);
    let node = session
        .node_for(namespace, name)
        .with_context(|| format!("没有找到属性: {}", name))?;

    let config = session.config();
    let exporter = PropDescExporter::new(config.publisher.clone(), config.product.clone());
    let path = session.export_node(namespace, node, &exporter)?;

    if !cli.quiet {
        println!("已导出到 {}", path.display());
    }
    Ok(())
}

fn print_bulk(cli: &Cli, action: &str, messages: &[String], summary: &str) {
    if cli.quiet {
        return;
    }
    for message in messages {
        println!("  {}", message);
    }
    println!("批量{}完成: {}", action, summary);
}
