//! Remote actions performed by each step

use pf_core::{InstallJob, StepError, StepName};

use super::context::StepContext;
use super::os_release::OsRelease;
use crate::artifacts::{self, ConfigSecrets, CONFIG_FILE, SCHEMA_FILE};
use crate::secret::{generate_password, generate_token};
use crate::shell::{quote, sql_literal};

/// Privileges granted to the panel's database user
const DB_PRIVILEGES: &str = "SELECT, INSERT, UPDATE, DELETE, CREATE, ALTER, INDEX, REFERENCES";

/// Bytes of randomness in the panel's session signing key
const APP_SECRET_BYTES: usize = 32;

/// Reads a password on stdin and prints its hash using the panel runtime
const HASH_HELPER: &str = "<?php\necho password_hash(stream_get_contents(STDIN), PASSWORD_DEFAULT);\n";

/// Run the remote actions of one step
pub async fn run_step(name: StepName, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    match name {
        StepName::SystemCheck => system_check(ctx).await,
        StepName::SystemUpdate => system_update(ctx).await,
        StepName::InstallDependencies => install_dependencies(ctx).await,
        StepName::SetupWebserver => setup_webserver(ctx).await,
        StepName::SetupDatabase => setup_database(ctx).await,
        StepName::UploadFiles => upload_files(ctx).await,
        StepName::ConfigurePanel => configure_panel(ctx).await,
        StepName::SetupPermissions => setup_permissions(ctx).await,
        StepName::Finalize => finalize(ctx).await,
    }
}

/// `http://<host>/<last install path component>`
pub fn panel_url(job: &InstallJob) -> String {
    let host = &job.target.address;
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.clone()
    };
    format!("http://{}/{}", host, job.panel.panel_segment())
}

async fn system_check(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let output = ctx.run("cat /etc/os-release").await?;
    let release = OsRelease::parse(&output.stdout);

    if !release.is_supported(&ctx.platform.supported_distributions) {
        return Err(StepError::UnsupportedPlatform {
            detected: release.display_name().to_string(),
            supported: ctx.platform.supported_label(),
        });
    }

    tracing::info!(
        "Detected {} {}",
        release.display_name(),
        release.version_id.as_deref().unwrap_or("")
    );
    Ok(())
}

async fn system_update(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    ctx.run("DEBIAN_FRONTEND=noninteractive apt-get update").await?;
    Ok(())
}

async fn install_dependencies(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let packages: Vec<String> = ctx.platform.packages().iter().map(|p| quote(p)).collect();
    let command = format!(
        "DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
        packages.join(" ")
    );
    ctx.run(&command).await?;
    Ok(())
}

async fn setup_webserver(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let service = quote(&ctx.platform.web_server);
    ctx.run(&format!("systemctl enable {}", service)).await?;
    ctx.run(&format!("systemctl start {}", service)).await?;
    ctx.run("a2enmod rewrite").await?;
    ctx.run(&format!("systemctl reload {}", service)).await?;
    Ok(())
}

/// SQL that creates the database and a user limited to it, rotating the
/// user's password if it already exists
fn database_script(db_name: &str, db_user: &str, password: &str) -> String {
    let account = format!("{}@'localhost'", sql_literal(db_user));
    let secret = sql_literal(password);
    format!(
        "CREATE DATABASE IF NOT EXISTS `{db}` CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci;\n\
         CREATE USER IF NOT EXISTS {account} IDENTIFIED BY {secret};\n\
         ALTER USER {account} IDENTIFIED BY {secret};\n\
         GRANT {privileges} ON `{db}`.* TO {account};\n\
         FLUSH PRIVILEGES;\n",
        db = db_name,
        account = account,
        secret = secret,
        privileges = DB_PRIVILEGES,
    )
}

/// Command that connects as `db_user`, reading the password from stdin
fn verify_command(db_name: &str, db_user: &str) -> String {
    format!(
        "IFS= read -r MYSQL_PWD && export MYSQL_PWD && mysql -u {} -D {} -N -B -e 'SELECT 1'",
        quote(db_user),
        quote(db_name)
    )
}

async fn setup_database(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let db = ctx.database;
    let password = generate_password(db.password_length);

    ctx.run_with_input("mysql", database_script(&db.name, &db.user, &password).as_bytes())
        .await?;

    let mut credential = password.clone().into_bytes();
    credential.push(b'\n');
    let output = ctx
        .exec(&verify_command(&db.name, &db.user), Some(credential.as_slice()))
        .await?;
    if !output.success() || output.stdout.trim() != "1" {
        let reason = match output.stderr.trim() {
            "" => format!("exit status {}", output.exit_code),
            stderr => stderr.to_string(),
        };
        return Err(StepError::DatabaseVerification(reason));
    }

    tracing::info!("Database {} ready for user {}", db.name, db.user);
    ctx.db_password = Some(password);
    Ok(())
}

async fn upload_files(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let dir = ctx.install_dir().to_string();
    ctx.run(&format!(
        "mkdir -p {} {} {}",
        quote(&dir),
        quote(&ctx.install_file("uploads")),
        quote(&ctx.install_file("backups"))
    ))
    .await?;

    let files = artifacts::generate(ctx.job.panel.tier);
    for (name, content) in &files {
        ctx.upload(&ctx.install_file(name), content).await?;
    }
    tracing::info!("Uploaded {} panel files to {}", files.len(), dir);

    ctx.config_template = files.get(CONFIG_FILE).cloned();
    Ok(())
}

async fn configure_panel(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let db = ctx.database;
    let db_password = ctx
        .db_password
        .as_deref()
        .ok_or(StepError::MissingState("database password"))?;
    let template = ctx
        .config_template
        .as_deref()
        .ok_or(StepError::MissingState("configuration template"))?;

    let app_secret = generate_token(APP_SECRET_BYTES);
    let config = artifacts::render_config(
        template,
        &ConfigSecrets {
            db_name: &db.name,
            db_user: &db.user,
            db_password,
            app_secret: &app_secret,
        },
    );
    ctx.upload(&ctx.install_file(CONFIG_FILE), &config).await?;

    ctx.run(&format!(
        "mysql -D {} < {}",
        quote(&db.name),
        quote(&ctx.install_file(SCHEMA_FILE))
    ))
    .await?;
    ctx.run(&format!("rm -f {}", quote(&ctx.install_file(SCHEMA_FILE))))
        .await?;

    let hash = admin_password_hash(ctx).await?;
    let admin = format!(
        "INSERT INTO admin_users (username, password) VALUES ({}, {})\n  \
         ON DUPLICATE KEY UPDATE password = VALUES(password);\n",
        sql_literal(&ctx.job.panel.admin_username),
        sql_literal(&hash)
    );
    ctx.run_with_input(&format!("mysql -D {}", quote(&db.name)), admin.as_bytes())
        .await?;

    tracing::info!("Panel configured for admin {}", ctx.job.panel.admin_username);
    Ok(())
}

/// Hash the admin password with the target's PHP runtime.
///
/// The helper script holds no secret; the password is passed on stdin. The
/// helper is removed whether or not hashing succeeded.
async fn admin_password_hash(ctx: &StepContext<'_>) -> Result<String, StepError> {
    let helper = format!("/tmp/panelforge-hash-{}.php", generate_token(8));
    ctx.upload(&helper, HASH_HELPER).await?;

    let hashed = ctx
        .run_with_input(
            &format!("php {}", quote(&helper)),
            ctx.job.panel.admin_password.expose().as_bytes(),
        )
        .await;

    if let Err(e) = ctx.run(&format!("rm -f {}", quote(&helper))).await {
        tracing::warn!("Failed to remove hash helper {}: {}", helper, e);
    }

    let hash = hashed?.stdout.trim().to_string();
    if !hash.starts_with('$') {
        return Err(StepError::CommandFailed {
            command: "php password_hash".to_string(),
            exit_code: 0,
            stderr: "runtime returned no password hash".to_string(),
        });
    }
    Ok(hash)
}

async fn setup_permissions(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let dir = quote(ctx.install_dir());
    let user = &ctx.platform.web_user;

    ctx.run(&format!("chown -R {} {}", quote(&format!("{0}:{0}", user)), dir))
        .await?;
    ctx.run(&format!("find {} -type d -exec chmod 755 {{}} +", dir))
        .await?;
    ctx.run(&format!("find {} -type f -exec chmod 644 {{}} +", dir))
        .await?;
    ctx.run(&format!("chmod 640 {}", quote(&ctx.install_file(CONFIG_FILE))))
        .await?;
    ctx.run(&format!("chmod -R 775 {}", quote(&ctx.install_file("uploads"))))
        .await?;
    Ok(())
}

/// Apache site definition serving the install directory, at the site root
/// and under its last path component
fn virtual_host(site: &str, install_dir: &str, segment: &str) -> String {
    format!(
        "<VirtualHost *:80>\n    \
         ServerAdmin webmaster@localhost\n    \
         DocumentRoot \"{dir}\"\n    \
         Alias /{segment} \"{dir}\"\n\n    \
         <Directory \"{dir}\">\n        \
         Options -Indexes +FollowSymLinks\n        \
         AllowOverride All\n        \
         Require all granted\n    \
         </Directory>\n\n    \
         <FilesMatch \"\\.sql$\">\n        \
         Require all denied\n    \
         </FilesMatch>\n\n    \
         ErrorLog ${{APACHE_LOG_DIR}}/{site}_error.log\n    \
         CustomLog ${{APACHE_LOG_DIR}}/{site}_access.log combined\n\
         </VirtualHost>\n",
        segment = segment,
        dir = install_dir,
        site = site,
    )
}

async fn finalize(ctx: &mut StepContext<'_>) -> Result<(), StepError> {
    let platform = ctx.platform;
    let vhost = virtual_host(
        &platform.site_name,
        ctx.install_dir(),
        ctx.job.panel.panel_segment(),
    );
    let site_file = format!("/etc/apache2/sites-available/{}.conf", platform.site_name);
    ctx.upload(&site_file, &vhost).await?;

    ctx.run(&format!("a2dissite {}", quote(&platform.default_site)))
        .await?;
    ctx.run(&format!("a2ensite {}", quote(&platform.site_name)))
        .await?;
    ctx.run(&format!("systemctl reload {}", quote(&platform.web_server)))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_core::{PanelConfig, TargetHost, Tier};

    #[test]
    fn test_panel_url() {
        let job = InstallJob {
            target: TargetHost::new("203.0.113.10", "root", "pw"),
            panel: PanelConfig::new("admin", "pw", Tier::Free),
        };
        assert_eq!(panel_url(&job), "http://203.0.113.10/panel");
    }

    #[test]
    fn test_panel_url_brackets_ipv6() {
        let job = InstallJob {
            target: TargetHost::new("2001:db8::1", "root", "pw"),
            panel: PanelConfig::new("admin", "pw", Tier::Free),
        };
        assert_eq!(panel_url(&job), "http://[2001:db8::1]/panel");
    }

    #[test]
    fn test_database_script_escapes_password() {
        let script = database_script("ssh_panel", "sshpanel", "a'b");
        assert!(script.contains("CREATE DATABASE IF NOT EXISTS `ssh_panel`"));
        assert!(script.contains("CREATE USER IF NOT EXISTS 'sshpanel'@'localhost' IDENTIFIED BY 'a\\'b';"));
        assert!(script.contains("ALTER USER 'sshpanel'@'localhost' IDENTIFIED BY 'a\\'b';"));
        assert!(script.contains("ON `ssh_panel`.* TO 'sshpanel'@'localhost'"));
        assert!(!script.contains("ALL PRIVILEGES"));
    }

    #[test]
    fn test_verify_command_keeps_password_out_of_argv() {
        let command = verify_command("ssh_panel", "sshpanel");
        assert!(command.starts_with("IFS= read -r MYSQL_PWD"));
        assert!(command.contains("-u 'sshpanel' -D 'ssh_panel'"));
    }

    #[test]
    fn test_virtual_host_aliases_segment() {
        let vhost = virtual_host("ssh-panel", "/var/www/html/panel", "panel");
        assert!(vhost.contains("Alias /panel \"/var/www/html/panel\""));
        assert!(vhost.contains("<Directory \"/var/www/html/panel\">"));
        assert!(vhost.contains("${APACHE_LOG_DIR}/ssh-panel_error.log"));
    }

    #[test]
    fn test_virtual_host_root_is_install_dir() {
        for dir in ["/var/www/panel", "/srv/panel", "/var/www/html/panel"] {
            let vhost = virtual_host("ssh-panel", dir, "panel");
            let root = vhost
                .lines()
                .find_map(|l| l.trim().strip_prefix("DocumentRoot "))
                .unwrap();
            assert_eq!(root, format!("\"{}\"", dir));
        }
    }

    #[test]
    fn test_virtual_host_denies_sql_files() {
        let vhost = virtual_host("ssh-panel", "/var/www/html/panel", "panel");
        assert!(vhost.contains("<FilesMatch \"\\.sql$\">"));
        assert!(vhost.contains("Require all denied"));
    }
}
