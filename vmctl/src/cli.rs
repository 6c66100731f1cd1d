//! Command-line parsing.
//!
//! The surface is `<prog> <command> <vmxpath> [options]`. Commands and
//! options are accepted with or without leading dashes (`start`, `-start`,
//! `nogui`, `-nogui`), which is why this is parsed by hand.

use std::fmt;

use vmctl_client::PowerOnOptions;
use vmctl_core::parse_variable_names;

use crate::error::UsageError;

/// Action requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Suspend,
    Status,
    GetIp,
}

impl Command {
    fn parse(word: &str) -> Option<Self> {
        match word.strip_prefix('-').unwrap_or(word) {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "suspend" => Some(Self::Suspend),
            "status" => Some(Self::Status),
            "getip" => Some(Self::GetIp),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Suspend => "suspend",
            Self::Status => "status",
            Self::GetIp => "getip",
        })
    }
}

/// A fully parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    /// VM descriptor path.
    pub vmx: String,
    pub power_on: PowerOnOptions,
    /// Poll until the VM powers off after `start`.
    pub wait: bool,
    /// Write the heartbeat file while polling.
    pub heartbeat: bool,
    /// Guest variables to sample each tick.
    pub variables: Vec<String>,
}

impl Invocation {
    /// Whether the invocation enters the poll loop and so honours Ctrl-C
    /// as a request to stop waiting. Every other invocation keeps the
    /// default interrupt behaviour.
    #[must_use]
    pub fn interruptible(&self) -> bool {
        self.command == Command::Start && self.wait
    }
}

/// Parse the arguments after the program name.
///
/// Options are recognised anywhere after the program name, including in
/// the command and path positions.
///
/// # Errors
/// Returns [`UsageError`] for missing positionals, an unknown command, a
/// `-var` with no value, an unusable variable name, or a help request.
pub fn parse(args: &[String]) -> Result<Invocation, UsageError> {
    let [command, vmx, ..] = args else {
        return Err(UsageError::MissingArguments);
    };

    let mut invocation = Invocation {
        command: Command::Start,
        vmx: vmx.clone(),
        power_on: PowerOnOptions::LaunchGui,
        wait: false,
        heartbeat: false,
        variables: Vec::new(),
    };

    let mut rest = args.iter();
    while let Some(arg) = rest.next() {
        match option_name(arg) {
            "nogui" => invocation.power_on = PowerOnOptions::Headless,
            "wait" => invocation.wait = true,
            "heartbeat" => invocation.heartbeat = true,
            "var" | "vars" => {
                let list = rest.next().ok_or(UsageError::MissingVarValue)?;
                invocation.variables = parse_variable_names(list)?;
            }
            "help" | "h" => return Err(UsageError::HelpRequested),
            _ => {}
        }
    }

    invocation.command =
        Command::parse(command).ok_or_else(|| UsageError::UnknownCommand(command.clone()))?;
    Ok(invocation)
}

fn option_name(arg: &str) -> &str {
    arg.strip_prefix("--")
        .or_else(|| arg.strip_prefix('-'))
        .unwrap_or(arg)
}

/// Usage text for `program`.
#[must_use]
pub fn usage(program: &str) -> String {
    format!(
        "
Usage: {program} <command> <vmxpath> [options]

  <command>
    desired action, either `-start`, `-suspend`, `-stop`, `-status` or `-getip`

  <vmxpath>
    absolute path to the .vmx file for the virtual machine, or the datastore
    path (such as \"[standard] ubuntu/ubuntu.vmx\") for remote hosts

  [options]
      -nogui: start virtual machine without UI
      -wait: after starting wait for virtual machine to exit
      -help: shows this help
      -heartbeat: maintains file `heartbeat.log` with status information
      -var \"space separated variables\": guestinfo values for heartbeat

Examples:
  {program} -start C:\\Users\\Name\\VirtualMachine.vmx
  {program} -start vm.vmx -wait -heartbeat -var \"ip modem_status\"
  {program} -stop \"C:\\Users\\User Name\\Virtual Machine.vmx\"
"
    )
}
