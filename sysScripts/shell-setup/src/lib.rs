//! PowerShell Environment Setup
//!
//! Takes a fresh Windows account to a themed PowerShell prompt:
//! 1. **Preconditions:** Refuses to run without an elevated process or a network connection.
//! 2. **Profile:** Backs up `$PROFILE` and replaces it with the shared remote profile.
//! 3. **Font:** Installs a Nerd Font exactly once (see [`fonts`]).
//! 4. **Packages:** Oh My Posh, Chocolatey, Terminal-Icons and zoxide through their
//!    package managers.
//! 5. **Verification:** Confirms the profile, prompt tool and font are in place.

pub mod checks;
pub mod config;
pub mod download;
pub mod fonts;
pub mod logging;
pub mod packages;
pub mod powershell;
pub mod profile;
pub mod setup;
