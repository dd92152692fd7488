//! Settings commands.

use clap::Args;
use clipflow::Settings;

use super::print_json;
use crate::state::AppState;

/// Fields accepted by `settings set`. Omitted flags leave values unchanged;
/// an empty string clears a value.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Logo asset reference
    #[arg(long)]
    pub logo: Option<String>,
    /// Comma-separated subtitle languages
    #[arg(long)]
    pub sub_langs: Option<String>,
    /// Comma-separated posting times
    #[arg(long)]
    pub slots: Option<String>,
    /// Posting days, e.g. "Mon-Sun"
    #[arg(long)]
    pub days: Option<String>,
    /// Nasheed audio asset reference
    #[arg(long)]
    pub nasheed: Option<String>,
    /// Sound-effects asset reference
    #[arg(long)]
    pub sfx: Option<String>,
}

impl SettingsArgs {
    pub fn is_empty(&self) -> bool {
        self.logo.is_none()
            && self.sub_langs.is_none()
            && self.slots.is_none()
            && self.days.is_none()
            && self.nasheed.is_none()
            && self.sfx.is_none()
    }

    /// Merges the given flags into `settings`.
    pub fn apply(self, settings: &mut Settings) {
        fn merge(target: &mut Option<String>, value: Option<String>) {
            if let Some(value) = value {
                *target = if value.trim().is_empty() {
                    None
                } else {
                    Some(value)
                };
            }
        }

        merge(&mut settings.logo, self.logo);
        merge(&mut settings.sub_langs, self.sub_langs);
        merge(&mut settings.slots, self.slots);
        merge(&mut settings.days, self.days);
        merge(&mut settings.nasheed, self.nasheed);
        merge(&mut settings.sfx, self.sfx);
    }
}

pub fn show(state: &AppState) -> anyhow::Result<()> {
    let settings = state.engine.settings();
    if state.json {
        return print_json(&settings);
    }
    print_settings(&settings);
    Ok(())
}

pub fn set(state: &AppState, args: SettingsArgs) -> anyhow::Result<()> {
    if args.is_empty() {
        anyhow::bail!("nothing to change; pass at least one flag (see `settings set --help`)");
    }
    let settings = state.engine.update_settings(|s| args.apply(s))?;
    if state.json {
        return print_json(&settings);
    }
    println!("Settings saved.");
    print_settings(&settings);
    Ok(())
}

fn print_settings(settings: &Settings) {
    let unset = "-";
    println!("Logo          {}", settings.logo.as_deref().unwrap_or(unset));
    println!("Subtitles     {}", settings.sub_langs_or_default());
    println!("Slots         {}", settings.slots_or_default());
    println!("Days          {}", settings.days_or_default());
    println!("Nasheed       {}", settings.nasheed.as_deref().unwrap_or(unset));
    println!("SFX           {}", settings.sfx.as_deref().unwrap_or(unset));
}
