//! Command recognition: `/name arg ...` with Chinese aliases.

use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandName {
    Fill,
    Boom,
    AddList,
    ShowList,
    DeleteList,
    SetBoomCd,
    Help,
}

impl FromStr for CommandName {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fill" | "贴" => Ok(CommandName::Fill),
            "爆破猴" | "boom" => Ok(CommandName::Boom),
            "add_list" => Ok(CommandName::AddList),
            "show_list" => Ok(CommandName::ShowList),
            "delete_list" => Ok(CommandName::DeleteList),
            "set_boom_cd" => Ok(CommandName::SetBoomCd),
            "emoji_help" | "贴表情帮助" | "表情帮助" => Ok(CommandName::Help),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bulk-react to the quoted message; `None` means the configured default.
    Fill { count: Option<i64> },
    /// Toggle 🐵 on the quoted message `count` times.
    Boom { count: i64 },
    AddList { id: Option<String> },
    ShowList,
    /// Remove one id, or everything with `ALL`.
    DeleteList { target: Option<String> },
    SetBoomCd { seconds: Option<i64> },
    Help,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("参数 {value} 不是有效的整数。用法：{usage}")]
    NotAnInteger { value: String, usage: &'static str },
}

impl Command {
    /// Parse `text` as a command. Returns `None` when the text is not a
    /// command at all, `Some(Err)` when it is one with a malformed argument.
    pub fn parse(prefix: &str, text: &str) -> Option<Result<Command, CommandError>> {
        let rest = text.trim().strip_prefix(prefix)?;
        let mut tokens = rest.split_whitespace();
        let name: CommandName = tokens.next()?.parse().ok()?;
        let arg = tokens.next();

        let command = match name {
            CommandName::Fill => int_arg(arg, "/fill [数量]").map(|count| Command::Fill { count }),
            CommandName::Boom => int_arg(arg, "/爆破猴 [次数]").map(|count| Command::Boom {
                count: count.unwrap_or(0),
            }),
            CommandName::AddList => Ok(Command::AddList {
                id: arg.map(str::to_string),
            }),
            CommandName::ShowList => Ok(Command::ShowList),
            CommandName::DeleteList => Ok(Command::DeleteList {
                target: arg.map(str::to_string),
            }),
            CommandName::SetBoomCd => {
                int_arg(arg, "/set_boom_cd [秒]").map(|seconds| Command::SetBoomCd { seconds })
            }
            CommandName::Help => Ok(Command::Help),
        };
        Some(command)
    }

    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Command::AddList { .. }
                | Command::ShowList
                | Command::DeleteList { .. }
                | Command::SetBoomCd { .. }
        )
    }
}

fn int_arg(arg: Option<&str>, usage: &'static str) -> Result<Option<i64>, CommandError> {
    match arg {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .map(Some)
            .map_err(|_| CommandError::NotAnInteger {
                value: raw.to_string(),
                usage,
            }),
    }
}

pub fn help_text(boom_cd_secs: u64) -> String {
    format!(
        "贴表情插件使用方法:
1. /fill [数量] - 随机贴表情 (别名: /贴)
2. /爆破猴 [次数] - 重复贴表情并取消，产生爆破效果 (别名: /boom)
3. /add_list [ID] - 将用户添加到特殊列表 (管理员)
4. /delete_list [ID|ALL] - 从特殊列表删除用户 (管理员)
5. /show_list - 显示特殊列表 (管理员)
6. /set_boom_cd [秒] - 设置爆破猴CD时间 (管理员)
7. /emoji_help - 显示本帮助 (别名: /贴表情帮助, /表情帮助)

注意:
- 使用 /fill 或 /贴 命令的非管理员用户会自动被添加到特殊列表
- 爆破猴命令有CD时间限制，当前为{}秒",
        boom_cd_secs
    )
}
