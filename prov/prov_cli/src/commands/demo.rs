//! Simulated recording session.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use prov_capture::{
    hook_code, Credentials, CpuTimes, ExecArgs, FileObject, IoAccounting, MemorySink, MmSnapshot,
    RecordResult, Recorder, RecorderConfig, SimTask, VmArea, VmFlags,
};
use prov_core::taxonomy::{entity, relation};
use prov_policy::{PolicyConfig, PolicyGate};

fn report(step: &str, result: RecordResult) {
    match &result {
        Ok(outcome) => info!("{}: {:?}", step, outcome),
        Err(e) => warn!("{}: {} (hook code {})", step, e, hook_code(&result)),
    }
}

fn file(recorder: &Recorder, path: &str) -> Result<Arc<FileObject>> {
    Ok(Arc::new(FileObject {
        path: path.to_string(),
        prov: recorder.create_entry(entity::INODE_FILE)?,
    }))
}

/// `provctl demo`
pub fn run(policy: Option<&Path>, capture_all: bool, summary: bool) -> Result<()> {
    let mut config = PolicyConfig::load(policy)?;
    if capture_all {
        config.capture_all = true;
    }

    let sink = Arc::new(MemorySink::new());
    let recorder = Recorder::new(
        &RecorderConfig::default(),
        Arc::new(PolicyGate::from_config(&config)?),
        sink.clone(),
    )?;

    let exe = file(&recorder, "/usr/bin/cat")?;
    let libc = file(&recorder, "/usr/lib/libc.so.6")?;
    let hosts = file(&recorder, "/etc/hosts")?;

    let task = SimTask::new(4242)
        .with_credentials(Credentials {
            uid: 1000,
            gid: 1000,
            secid: 0,
        })
        .with_cpu_times(CpuTimes {
            utime_ns: 1_250_000,
            stime_ns: 730_000,
        })
        .with_io(IoAccounting::Chars {
            rchar: 8192,
            wchar: 0,
        })
        .with_mm(MmSnapshot {
            total_vm: 600,
            rss: 150,
            hiwater_vm: 640,
            hiwater_rss: 160,
            areas: vec![VmArea {
                start: 0x7f00_0000_0000,
                end: 0x7f00_0020_0000,
                flags: VmFlags::READ | VmFlags::EXEC | VmFlags::MAYSHARE,
                file: Some(Arc::clone(&libc)),
            }],
        })
        .with_exe(Arc::clone(&exe));
    let process = recorder.create_process(Arc::new(task))?;
    process.task_prov().set_tracked();
    process.cred_prov().set_tracked();

    let cred = process.cred_prov();
    let task = process.task_prov();

    report(
        "open",
        recorder.record_relation(relation::OPEN, &hosts.prov, cred, Some(&hosts.path), 0),
    );
    report(
        "name",
        recorder.record_node_name(&hosts.prov, &hosts.path, false),
    );
    report(
        "read",
        recorder.record_relation(relation::READ, &hosts.prov, cred, Some(&hosts.path), 0),
    );
    report(
        "memory_read",
        recorder.record_relation(relation::PROC_READ, cred, task, None, 0),
    );
    recorder.task_provenance(&process, true);
    recorder.cred_provenance(&process);
    report(
        "args",
        recorder.record_args(
            cred,
            &ExecArgs::new(&["cat", "/etc/hosts"], &["LANG=C", "HOME=/home/demo"]),
        ),
    );
    report(
        "shared",
        recorder.record_shared_mappings(cred, process.task(), true),
    );

    let records = sink.records();
    if summary {
        let stats = recorder.stats();
        println!(
            "records: {} relations: {} emitted: {} skipped: {} failed: {}",
            records.len(),
            sink.relations().len(),
            stats.emitted(),
            stats.skipped(),
            stats.failed()
        );
        return Ok(());
    }

    for record in &records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
