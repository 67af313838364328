//! Task descriptor renderer
//!
//! Pure functions from (task kind, host descriptor, request parameters) to
//! descriptor text plus a success sentinel. Rendering is deterministic:
//! identical inputs produce byte-identical descriptors.
//!
//! Each sentinel is `ok=N` where N is the number of steps in the descriptor;
//! the evaluator matches these literally, so step counts are part of the
//! contract of every task kind.

use std::path::Path;

use hostforge_api::{DhcpConfig, HostDescriptor};

use crate::config::{GitSettings, Settings};
use crate::task::{AuxFile, TaskSpec};

/// Inputs shared by every render call of one deployment
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Target host
    pub host: &'a HostDescriptor,
    /// Directory auxiliary config files are staged in
    pub staging_dir: &'a Path,
}

impl RenderContext<'_> {
    fn aux_path(&self, task: &str, suffix: &str) -> std::path::PathBuf {
        self.staging_dir.join(format!(
            "{}_{}_{}_{}",
            self.host.addr, self.host.site_id, task, suffix
        ))
    }
}

/// Install one package (1 step)
#[must_use]
pub fn package_install(_ctx: RenderContext<'_>, package: &str) -> TaskSpec {
    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: install {package}\n\
         \x20   become: yes\n\
         \x20   apt: name={package}\n"
    );
    TaskSpec {
        name: package.to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=1".to_string(),
    }
}

/// Configure the DHCP server (2 steps: config file, serving interface)
#[must_use]
pub fn dhcp_server(ctx: RenderContext<'_>, dhcp: &DhcpConfig) -> TaskSpec {
    let conf_path = ctx.aux_path("dhcp", "config");
    let conf = format!(
        "subnet {network} netmask {mask} {{\n\
         \x20 range {start} {end};\n\
         \x20 option domain-name-servers {dns};\n\
         \x20 option domain-name \"{domain}\";\n\
         \x20 option subnet-mask {mask};\n\
         \x20 option routers {gateway};\n\
         \x20 option broadcast-address {broadcast};\n\
         \x20 default-lease-time 600;\n\
         \x20 max-lease-time 7200;\n\
         }}\n",
        network = dhcp.dhcp_network,
        mask = dhcp.dhcp_mask,
        start = dhcp.dhcp_range_start,
        end = dhcp.dhcp_range_end,
        dns = dhcp.dhcp_dns,
        domain = dhcp.domain_name,
        gateway = dhcp.dhcp_gateway,
        broadcast = dhcp.dhcp_broadcast,
    );

    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: copy dhcpd.conf\n\
         \x20   become: yes\n\
         \x20   copy:\n\
         \x20     src: {conf}\n\
         \x20     dest: /etc/dhcp/dhcpd.conf\n\
         \x20     owner: root\n\
         \x20     group: root\n\
         \x20 - name: set dhcp serving interface\n\
         \x20   become: yes\n\
         \x20   lineinfile:\n\
         \x20     path: /etc/default/isc-dhcp-server\n\
         \x20     regexp: INTERFACESv4=\"\"\n\
         \x20     line: INTERFACESv4={interface}\n",
        conf = conf_path.display(),
        interface = dhcp.dhcp_interface,
    );

    TaskSpec {
        name: "dhcp".to_string(),
        playbook,
        aux_files: vec![AuxFile {
            path: conf_path,
            contents: conf,
        }],
        sentinel: "ok=2".to_string(),
    }
}

/// Configure the reverse proxy serving the application tree (1 step)
#[must_use]
pub fn reverse_proxy(ctx: RenderContext<'_>) -> TaskSpec {
    let site_path = ctx.aux_path("nginx_config", "site");
    let site = format!(
        "server {{\n\
         \x20       listen 80 default_server;\n\
         \x20       root /home/{login}/app;\n\
         \x20       index index.html index.htm index.nginx-debian.html;\n\
         \x20       server_name _;\n\
         \x20       location / {{\n\
         \x20               try_files $uri $uri/ =404;\n\
         \x20       }}\n\
         }}\n",
        login = ctx.host.login,
    );

    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: copy nginx site config\n\
         \x20   become: yes\n\
         \x20   copy:\n\
         \x20     src: {site}\n\
         \x20     dest: /etc/nginx/sites-available/default\n\
         \x20     owner: root\n\
         \x20     group: root\n\
         \x20     mode: \"0755\"\n",
        site = site_path.display(),
    );

    TaskSpec {
        name: "nginx_config".to_string(),
        playbook,
        aux_files: vec![AuxFile {
            path: site_path,
            contents: site,
        }],
        sentinel: "ok=1".to_string(),
    }
}

/// Schedule the periodic application sync job and its log rotation (6 steps)
#[must_use]
pub fn scheduled_sync(ctx: RenderContext<'_>) -> TaskSpec {
    let login = &ctx.host.login;
    let site = &ctx.host.site_id;
    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: schedule app sync\n\
         \x20   cron:\n\
         \x20     name: app_sync\n\
         \x20     user: {login}\n\
         \x20     minute: \"*/10\"\n\
         \x20     hour: \"*\"\n\
         \x20     job: \"/home/{login}/app/utils/download.sh -h {site} > /dev/null\"\n\
         \x20 - name: create app_sync log\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /var/log/app_sync.log\n\
         \x20     state: touch\n\
         \x20 - name: allow access to app_sync log\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /var/log/app_sync.log\n\
         \x20     owner: {login}\n\
         \x20     group: {login}\n\
         \x20     mode: \"0775\"\n\
         \x20 - name: create app_sync logrotate entry\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /etc/logrotate.d/app_sync\n\
         \x20     state: touch\n\
         \x20 - name: allow access to logrotate entry\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /etc/logrotate.d/app_sync\n\
         \x20     owner: {login}\n\
         \x20     group: {login}\n\
         \x20     mode: \"0775\"\n\
         \x20 - name: write logrotate policy\n\
         \x20   become: yes\n\
         \x20   blockinfile:\n\
         \x20     path: /etc/logrotate.d/app_sync\n\
         \x20     block: |\n\
         \x20       /var/log/app_sync.log {{\n\
         \x20               weekly\n\
         \x20               missingok\n\
         \x20               rotate 8\n\
         \x20               compress\n\
         \x20               delaycompress\n\
         \x20               create 640 {login} {login}\n\
         \x20       }}\n"
    );

    TaskSpec {
        name: "crontab".to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=6".to_string(),
    }
}

/// Kernel network parameters: forwarding and multicast (1 step)
#[must_use]
pub fn kernel_params(_ctx: RenderContext<'_>) -> TaskSpec {
    let playbook = "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: enable forwarding and multicast\n\
         \x20   become: yes\n\
         \x20   blockinfile:\n\
         \x20     path: /etc/sysctl.conf\n\
         \x20     block: |\n\
         \x20       net.ipv4.ip_forward=1\n\
         \x20       net.ipv4.conf.all.rp_filter=0\n\
         \x20       net.ipv4.conf.default.rp_filter=0\n\
         \x20       net.ipv4.conf.all.mc_forwarding=1\n\
         \x20       net.ipv4.conf.default.mc_forwarding=1\n"
        .to_string();

    TaskSpec {
        name: "sysctl".to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=1".to_string(),
    }
}

/// Boot-time service via rc.local: start the application, set the multicast
/// route, masquerade the uplink (7 steps)
///
/// The multicast route binds to the DHCP serving interface when DHCP is
/// requested, otherwise to the uplink.
#[must_use]
pub fn boot_service(ctx: RenderContext<'_>, dhcp: &DhcpConfig) -> TaskSpec {
    let multicast_interface = if dhcp.dhcp_status {
        dhcp.dhcp_interface.as_str()
    } else {
        ctx.host.uplink_interface.as_str()
    };
    let uplink = &ctx.host.uplink_interface;

    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: create rc.local\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /etc/rc.local\n\
         \x20     state: touch\n\
         \x20     owner: root\n\
         \x20     group: root\n\
         \x20     mode: \"0755\"\n\
         \x20 - name: write boot script\n\
         \x20   become: yes\n\
         \x20   blockinfile:\n\
         \x20     path: /etc/rc.local\n\
         \x20     marker: \"\"\n\
         \x20     block: |\n\
         \x20       #!/bin/bash\n\
         \x20       /etc/init.d/pms start\n\
         \x20       route add -net 224.0.0.0/4 dev {multicast_interface}\n\
         \x20       iptables -w --table nat -A POSTROUTING -o {uplink} -j MASQUERADE\n\
         \x20       exit 0\n\
         \x20 - name: create rc-local service file\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /etc/systemd/system/rc-local.service\n\
         \x20     state: touch\n\
         \x20     owner: root\n\
         \x20     group: root\n\
         \x20     mode: \"0755\"\n\
         \x20 - name: write rc-local unit\n\
         \x20   become: yes\n\
         \x20   blockinfile:\n\
         \x20     path: /etc/systemd/system/rc-local.service\n\
         \x20     marker: \"\"\n\
         \x20     block: |\n\
         \x20       [Unit]\n\
         \x20       Description=/etc/rc.local Compatibility\n\
         \x20       ConditionPathExists=/etc/rc.local\n\
         \x20       [Service]\n\
         \x20       Type=forking\n\
         \x20       ExecStart=/etc/rc.local start\n\
         \x20       TimeoutSec=0\n\
         \x20       StandardOutput=tty\n\
         \x20       RemainAfterExit=yes\n\
         \x20       [Install]\n\
         \x20       WantedBy=multi-user.target\n\
         \x20 - name: enable rc-local\n\
         \x20   become: yes\n\
         \x20   shell: systemctl enable rc-local\n\
         \x20 - name: strip blank lines from rc.local\n\
         \x20   become: yes\n\
         \x20   lineinfile:\n\
         \x20     path: /etc/rc.local\n\
         \x20     state: absent\n\
         \x20     regexp: \"^$\"\n\
         \x20 - name: strip blank lines from rc-local unit\n\
         \x20   become: yes\n\
         \x20   lineinfile:\n\
         \x20     path: /etc/systemd/system/rc-local.service\n\
         \x20     state: absent\n\
         \x20     regexp: \"^$\"\n"
    );

    TaskSpec {
        name: "rc_local".to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=7".to_string(),
    }
}

/// Install the rsync backup agent: dedicated login, authorized key, payload,
/// monthly cron (7 steps)
#[must_use]
pub fn backup_agent(ctx: RenderContext<'_>, settings: &Settings) -> TaskSpec {
    let login = &ctx.host.login;
    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: schedule backup run\n\
         \x20   cron:\n\
         \x20     name: backup_rsync\n\
         \x20     user: {login}\n\
         \x20     minute: \"0\"\n\
         \x20     hour: \"0\"\n\
         \x20     day: \"23\"\n\
         \x20     job: \"/home/{login}/backup_rsync/start.sh\"\n\
         \x20 - name: add backup user\n\
         \x20   become: yes\n\
         \x20   user:\n\
         \x20     name: backup\n\
         \x20     shell: /bin/bash\n\
         \x20     append: yes\n\
         \x20 - name: create backup ssh directory\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: \"/home/backup/.ssh\"\n\
         \x20     state: directory\n\
         \x20 - name: create authorized_keys\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: \"/home/backup/.ssh/authorized_keys\"\n\
         \x20     state: touch\n\
         \x20 - name: install backup public key\n\
         \x20   become: yes\n\
         \x20   copy:\n\
         \x20     src: {pubkey}\n\
         \x20     dest: /home/backup/.ssh/authorized_keys\n\
         \x20     owner: backup\n\
         \x20     group: backup\n\
         \x20     mode: \"0600\"\n\
         \x20 - name: copy backup payload\n\
         \x20   become: yes\n\
         \x20   copy:\n\
         \x20     src: {payload}\n\
         \x20     dest: /home/{login}/backup_rsync\n\
         \x20     owner: backup\n\
         \x20     group: backup\n\
         \x20 - name: set payload permissions\n\
         \x20   become: yes\n\
         \x20   file:\n\
         \x20     path: /home/{login}/backup_rsync\n\
         \x20     mode: \"0755\"\n\
         \x20     recurse: yes\n",
        pubkey = settings.backup_pubkey.display(),
        payload = settings.backup_payload.display(),
    );

    TaskSpec {
        name: "backup_rsync".to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=7".to_string(),
    }
}

/// Change the hostname, pinning it against cloud-init (2 steps).
/// Skipped when no hostname was requested.
#[must_use]
pub fn hostname_change(ctx: RenderContext<'_>) -> Option<TaskSpec> {
    let hostname = ctx.host.hostname.trim();
    if hostname.is_empty() {
        return None;
    }

    let playbook = format!(
        "---\n\
         - hosts: all\n\
         \x20 gather_facts: no\n\
         \x20 tasks:\n\
         \x20 - name: preserve hostname across cloud-init\n\
         \x20   become: yes\n\
         \x20   lineinfile:\n\
         \x20     path: /etc/cloud/cloud.cfg\n\
         \x20     regexp: \"preserve_hostname:\"\n\
         \x20     line: \"preserve_hostname: true\"\n\
         \x20 - name: set hostname\n\
         \x20   become: yes\n\
         \x20   shell: hostnamectl set-hostname {hostname}\n"
    );

    Some(TaskSpec {
        name: "change_hostname".to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=2".to_string(),
    })
}

/// Check out and install one of the known applications (3 steps each).
/// Unknown application names render nothing.
#[must_use]
pub fn app_checkout(ctx: RenderContext<'_>, app: &str, git: &GitSettings) -> Option<TaskSpec> {
    let login = &ctx.host.login;
    let site = &ctx.host.site_id;
    let repo = format!(
        "https://{}:{}@bitbucket.org/{}/{app}.git",
        git.login, git.password, git.account
    );

    let playbook = match app {
        "tv" => format!(
            "---\n\
             - hosts: all\n\
             \x20 gather_facts: no\n\
             \x20 tasks:\n\
             \x20 - name: check out tv application\n\
             \x20   git:\n\
             \x20     repo: \"{repo}\"\n\
             \x20     dest: /home/{login}/app\n\
             \x20     version: develop\n\
             \x20 - name: create cache directory\n\
             \x20   file:\n\
             \x20     path: /home/{login}/app/c\n\
             \x20     state: directory\n\
             \x20 - name: install default config\n\
             \x20   shell:\n\
             \x20     cmd: cp /home/{login}/app/tv/config_def.js /home/{login}/app/tv/config.js\n"
        ),
        "pms" => format!(
            "---\n\
             - hosts: all\n\
             \x20 gather_facts: no\n\
             \x20 tasks:\n\
             \x20 - name: check out pms application\n\
             \x20   git:\n\
             \x20     repo: \"{repo}\"\n\
             \x20     dest: /home/{login}/pms\n\
             \x20 - name: install pms\n\
             \x20   become: yes\n\
             \x20   command: python3 setup.py install --force\n\
             \x20   args:\n\
             \x20     chdir: /home/{login}/pms/\n\
             \x20 - name: record site id\n\
             \x20   become: yes\n\
             \x20   lineinfile:\n\
             \x20     path: /etc/pms.cfg\n\
             \x20     regexp: \"^site_id = \"\n\
             \x20     line: \"site_id = {site}\"\n"
        ),
        _ => return None,
    };

    Some(TaskSpec {
        name: app.to_string(),
        playbook,
        aux_files: Vec::new(),
        sentinel: "ok=3".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn host() -> HostDescriptor {
        HostDescriptor {
            addr: "10.0.0.5".parse().unwrap(),
            port: 22,
            login: "deploy".to_string(),
            password: "pw".to_string(),
            sudo_password: "spw".to_string(),
            hostname: "edge-05".to_string(),
            site_id: "12".to_string(),
            uplink_interface: "eth0".to_string(),
        }
    }

    fn dhcp() -> DhcpConfig {
        DhcpConfig {
            dhcp_status: true,
            dhcp_network: "10.0.0.0".to_string(),
            dhcp_mask: "255.255.255.0".to_string(),
            dhcp_range_start: "10.0.0.10".to_string(),
            dhcp_range_end: "10.0.0.100".to_string(),
            dhcp_dns: "8.8.8.8".to_string(),
            domain_name: "guest.local".to_string(),
            dhcp_gateway: "10.0.0.1".to_string(),
            dhcp_broadcast: "10.0.0.255".to_string(),
            dhcp_interface: "eth0".to_string(),
        }
    }

    fn ctx<'a>(host: &'a HostDescriptor, staging: &'a Path) -> RenderContext<'a> {
        RenderContext {
            host,
            staging_dir: staging,
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let host = host();
        let staging = PathBuf::from("/tmp");
        let first = dhcp_server(ctx(&host, &staging), &dhcp());
        let second = dhcp_server(ctx(&host, &staging), &dhcp());
        assert_eq!(first, second);
    }

    #[test]
    fn package_descriptor_targets_the_package() {
        let host = host();
        let spec = package_install(ctx(&host, Path::new("/tmp")), "nginx");
        assert_eq!(spec.name, "nginx");
        assert_eq!(spec.sentinel, "ok=1");
        assert!(spec.playbook.contains("apt: name=nginx"));
    }

    #[test]
    fn dhcp_descriptor_carries_all_values_and_two_steps() {
        let host = host();
        let dhcp = dhcp();
        let spec = dhcp_server(ctx(&host, Path::new("/tmp")), &dhcp);

        let rendered = format!("{}{}", spec.playbook, spec.aux_files[0].contents);
        for value in [
            "10.0.0.0",
            "255.255.255.0",
            "10.0.0.10",
            "10.0.0.100",
            "8.8.8.8",
            "10.0.0.1",
            "10.0.0.255",
            "guest.local",
        ] {
            assert!(rendered.contains(value), "missing {value}");
        }
        assert!(spec.playbook.contains("INTERFACESv4=eth0"));
        assert_eq!(spec.sentinel, "ok=2");
    }

    #[test]
    fn sentinel_cardinality_is_fixed_per_task_kind() {
        let host = host();
        let staging = Path::new("/tmp");
        let git = GitSettings::default();
        let settings = Settings::default();

        assert_eq!(reverse_proxy(ctx(&host, staging)).sentinel, "ok=1");
        assert_eq!(scheduled_sync(ctx(&host, staging)).sentinel, "ok=6");
        assert_eq!(kernel_params(ctx(&host, staging)).sentinel, "ok=1");
        assert_eq!(boot_service(ctx(&host, staging), &dhcp()).sentinel, "ok=7");
        assert_eq!(backup_agent(ctx(&host, staging), &settings).sentinel, "ok=7");
        assert_eq!(
            hostname_change(ctx(&host, staging)).unwrap().sentinel,
            "ok=2"
        );
        assert_eq!(
            app_checkout(ctx(&host, staging), "tv", &git).unwrap().sentinel,
            "ok=3"
        );
        assert_eq!(
            app_checkout(ctx(&host, staging), "pms", &git).unwrap().sentinel,
            "ok=3"
        );
    }

    #[test]
    fn boot_service_selects_multicast_interface() {
        let host = host();
        let staging = Path::new("/tmp");

        let mut with_dhcp = dhcp();
        with_dhcp.dhcp_interface = "eth1".to_string();
        let spec = boot_service(ctx(&host, staging), &with_dhcp);
        assert!(spec.playbook.contains("route add -net 224.0.0.0/4 dev eth1"));

        let without = DhcpConfig::default();
        let spec = boot_service(ctx(&host, staging), &without);
        assert!(spec.playbook.contains("route add -net 224.0.0.0/4 dev eth0"));
        // The masquerade rule always binds the uplink
        assert!(spec.playbook.contains("-o eth0 -j MASQUERADE"));
    }

    #[test]
    fn hostname_task_skipped_when_empty() {
        let mut host = host();
        host.hostname = "  ".to_string();
        assert!(hostname_change(ctx(&host, Path::new("/tmp"))).is_none());
    }

    #[test]
    fn unknown_app_renders_nothing() {
        let host = host();
        let git = GitSettings::default();
        assert!(app_checkout(ctx(&host, Path::new("/tmp")), "unknown", &git).is_none());
    }
}
