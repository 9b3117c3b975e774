//! Task-side recording: refresh routines, naming, kernel links and shared
//! mappings.

use std::sync::Arc;
use std::thread;

use prov_capture::{
    ChannelSink, CpuTimes, Credentials, FileObject, IoAccounting, MemorySink, MmSnapshot,
    ProcessTable, ProvEntry, Recorded, Recorder, RecorderConfig, SimTask, SkipReason, TaskSource,
    VmArea, VmFlags,
};
use prov_core::taxonomy::{activity, agent, entity, relation};
use prov_core::types::{Namespaces, ProvRecord};
use prov_core::RecordError;
use prov_policy::{PolicyConfig, PolicyGate};

fn recorder(sink: Arc<MemorySink>) -> Recorder {
    Recorder::new(
        &RecorderConfig::default(),
        Arc::new(PolicyGate::default()),
        sink,
    )
    .unwrap()
}

fn file(recorder: &Recorder, path: &str) -> Arc<FileObject> {
    let prov = recorder.create_entry(entity::INODE_FILE).unwrap();
    prov.set_tracked();
    Arc::new(FileObject {
        path: path.to_string(),
        prov,
    })
}

fn area(flags: VmFlags, file: Option<Arc<FileObject>>) -> VmArea {
    VmArea {
        start: 0x1000,
        end: 0x2000,
        flags,
        file,
    }
}

// Make the entry's node record appear in the sink.
fn mark_recorded(recorder: &Recorder, entry: &ProvEntry) {
    let other = recorder.create_entry(entity::INODE_FILE).unwrap();
    other.set_tracked();
    assert_eq!(
        recorder.record_relation(relation::WRITE, entry, &other, None, 0),
        Ok(Recorded::Emitted)
    );
}

#[test]
fn test_update_task_perf_units() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let entry = recorder.create_entry(activity::TASK).unwrap();
    let task = SimTask::new(42)
        .with_cpu_times(CpuTimes {
            utime_ns: 5_000_999,
            stime_ns: 1_000,
        })
        .with_io(IoAccounting::Storage {
            read_bytes: 5000,
            write_bytes: 1023,
            cancelled_write_bytes: 2048,
        })
        .with_mm(MmSnapshot {
            total_vm: 10,
            rss: 3,
            hiwater_vm: 12,
            hiwater_rss: 4,
            areas: Vec::new(),
        });

    recorder.update_task_perf(&entry, &task).unwrap();

    let state = entry.lock();
    let info = state.info().as_task().unwrap();
    assert_eq!(info.utime, 5000);
    assert_eq!(info.stime, 1);
    assert_eq!(info.vm, 40);
    assert_eq!(info.rss, 12);
    assert_eq!(info.hw_vm, 48);
    assert_eq!(info.hw_rss, 16);
    assert_eq!(info.rbytes, 4096);
    assert_eq!(info.wbytes, 0);
    assert_eq!(info.cancel_wbytes, 2048);
}

#[test]
fn test_update_task_perf_char_counts() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let entry = recorder.create_entry(activity::TASK).unwrap();
    let task = SimTask::new(42).with_io(IoAccounting::Chars {
        rchar: 3 * 1024 + 5,
        wchar: 1024,
    });

    recorder.update_task_perf(&entry, &task).unwrap();

    let state = entry.lock();
    let info = state.info().as_task().unwrap();
    assert_eq!(info.rbytes, 3 * 1024);
    assert_eq!(info.wbytes, 1024);
    assert_eq!(info.cancel_wbytes, 0);
    // No memory map: memory figures untouched.
    assert_eq!(info.vm, 0);
}

#[test]
fn test_refresh_rejects_wrong_family() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let file = recorder.create_entry(entity::INODE_FILE).unwrap();
    let task = SimTask::new(1);

    assert_eq!(
        recorder.update_task_perf(&file, &task),
        Err(RecordError::InvalidNode(entity::INODE_FILE))
    );
    assert_eq!(
        recorder.update_task_namespaces(&file, &task),
        Err(RecordError::InvalidNode(entity::INODE_FILE))
    );
    assert_eq!(
        recorder.update_cred(&file, &task),
        Err(RecordError::InvalidNode(entity::INODE_FILE))
    );
}

#[test]
fn test_task_and_cred_provenance() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let namespaces = Namespaces {
        utsns: 1,
        ipcns: 2,
        mntns: 3,
        pidns: 4,
        netns: 5,
        cgroupns: 6,
    };
    let task = SimTask::new(300)
        .with_vpid(3)
        .with_tgid(299)
        .with_namespaces(namespaces)
        .with_credentials(Credentials {
            uid: 1000,
            gid: 100,
            secid: 9,
        });
    let process = recorder.create_process(Arc::new(task)).unwrap();

    let entry = recorder.task_provenance(&process, false);
    {
        let state = entry.lock();
        let info = state.info().as_task().unwrap();
        assert_eq!((info.pid, info.vpid), (300, 3));
        assert_eq!(info.namespaces, namespaces);
    }

    let cred = recorder.cred_provenance(&process);
    let state = cred.lock();
    let info = state.info().as_proc().unwrap();
    assert_eq!((info.tgid, info.uid, info.gid, info.secid), (299, 1000, 100, 9));
}

#[test]
fn test_opaque_cred_is_untouched() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let task = SimTask::new(5).with_credentials(Credentials {
        uid: 1,
        gid: 1,
        secid: 1,
    });
    let process = recorder.create_process(Arc::new(task)).unwrap();
    process.cred_prov().set_opaque();

    let cred = recorder.cred_provenance(&process);
    assert_eq!(cred.lock().info().as_proc().unwrap().uid, 0);
}

#[test]
fn test_kernel_link_once_after_recording() {
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(sink.clone());
    let task = recorder.create_entry(activity::TASK).unwrap();
    task.set_tracked();

    assert_eq!(
        recorder.record_kernel_link(&task),
        Ok(Recorded::Skipped(SkipReason::NotRecorded))
    );

    mark_recorded(&recorder, &task);
    assert_eq!(recorder.record_kernel_link(&task), Ok(Recorded::Emitted));
    assert_eq!(
        recorder.record_kernel_link(&task),
        Ok(Recorded::Skipped(SkipReason::Duplicate))
    );

    let ran_on: Vec<_> = sink
        .relations()
        .into_iter()
        .filter(|r| r.kind() == relation::RAN_ON)
        .collect();
    assert_eq!(ran_on.len(), 1);
    assert_eq!(ran_on[0].from.id.prov_type(), agent::MACHINE);
    assert_eq!(ran_on[0].to.id, task.id());
}

#[test]
fn test_task_provenance_links_to_machine() {
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(sink.clone());
    let process = recorder.create_process(Arc::new(SimTask::new(7))).unwrap();
    process.task_prov().set_tracked();
    mark_recorded(&recorder, process.task_prov());

    recorder.task_provenance(&process, true);
    recorder.task_provenance(&process, true);

    let ran_on = sink
        .relations()
        .iter()
        .filter(|r| r.kind() == relation::RAN_ON)
        .count();
    assert_eq!(ran_on, 1);
}

#[test]
fn test_task_name() {
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(sink.clone());
    let exe = file(&recorder, "/usr/bin/vim");
    let task = SimTask::new(10).with_exe(exe);
    let cred = recorder.create_entry(entity::PROC).unwrap();
    cred.set_tracked();

    assert_eq!(
        recorder.record_task_name(&task, &cred),
        Ok(Recorded::Skipped(SkipReason::NotRecorded))
    );

    mark_recorded(&recorder, &cred);
    assert_eq!(recorder.record_task_name(&task, &cred), Ok(Recorded::Emitted));
    assert_eq!(
        recorder.record_task_name(&task, &cred),
        Ok(Recorded::Skipped(SkipReason::NameAlreadyRecorded))
    );

    let named = sink
        .relations()
        .into_iter()
        .find(|r| r.kind() == relation::NAMED)
        .unwrap();
    assert_eq!(named.to.id, cred.id());
}

#[test]
fn test_opaque_executable_makes_cred_opaque() {
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(sink.clone());
    let exe = file(&recorder, "/usr/sbin/sshd");
    exe.prov.set_opaque();
    let task = SimTask::new(10).with_exe(exe);
    let cred = recorder.create_entry(entity::PROC).unwrap();
    cred.set_tracked();
    mark_recorded(&recorder, &cred);
    let before = sink.len();

    assert_eq!(
        recorder.record_task_name(&task, &cred),
        Ok(Recorded::Skipped(SkipReason::Opaque))
    );
    assert!(cred.is_opaque());
    assert_eq!(sink.len(), before);
}

#[test]
fn test_task_without_executable() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let cred = recorder.create_entry(entity::PROC).unwrap();
    cred.set_tracked();
    mark_recorded(&recorder, &cred);

    assert_eq!(
        recorder.record_task_name(&SimTask::new(1), &cred),
        Ok(Recorded::Skipped(SkipReason::NoSource))
    );
}

#[test]
fn test_shared_mappings() {
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(sink.clone());
    let lib = file(&recorder, "/usr/lib/libc.so.6");
    let shm = file(&recorder, "/dev/shm/buffer");
    let private = file(&recorder, "/etc/ld.so.cache");

    let task = SimTask::new(20).with_mm(MmSnapshot {
        areas: vec![
            area(VmFlags::READ | VmFlags::EXEC | VmFlags::MAYSHARE, Some(lib.clone())),
            area(VmFlags::READ | VmFlags::WRITE | VmFlags::SHARED | VmFlags::MAYSHARE, Some(shm.clone())),
            area(VmFlags::READ, Some(private.clone())),
            area(VmFlags::READ | VmFlags::WRITE | VmFlags::MAYSHARE, None),
        ],
        ..MmSnapshot::default()
    });
    let cred = recorder.create_entry(entity::PROC).unwrap();

    assert_eq!(
        recorder.record_shared_mappings(&cred, &task, true),
        Ok(Recorded::Emitted)
    );
    let reads = sink.relations();
    assert_eq!(reads.len(), 2);
    assert!(reads.iter().all(|r| r.kind() == relation::SH_READ && r.to.id == cred.id()));
    assert_eq!(reads[0].from.id, lib.prov.id());
    assert_eq!(reads[0].context.as_deref(), Some("/usr/lib/libc.so.6"));
    assert_eq!(
        reads[0].flags,
        (VmFlags::READ | VmFlags::EXEC | VmFlags::MAYSHARE).bits()
    );
    assert_eq!(reads[1].from.id, shm.prov.id());

    sink.drain();
    assert_eq!(
        recorder.record_shared_mappings(&cred, &task, false),
        Ok(Recorded::Emitted)
    );
    let writes = sink.relations();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].kind(), relation::SH_WRITE);
    assert_eq!(writes[0].from.id, cred.id());
    assert_eq!(writes[0].to.id, shm.prov.id());

    // The walk releases every mapped file it borrowed.
    assert_eq!(Arc::strong_count(&lib), 2);
    task.release_mm();
    assert_eq!(
        recorder.record_shared_mappings(&cred, &task, true),
        Ok(Recorded::Skipped(SkipReason::NoSource))
    );
    assert_eq!(Arc::strong_count(&lib), 1);
}

#[test]
fn test_shared_flag_alone_counts_as_shared() {
    let sink = Arc::new(MemorySink::new());
    let recorder = recorder(sink.clone());
    let shm = file(&recorder, "/dev/shm/ring");
    let task = SimTask::new(21).with_mm(MmSnapshot {
        areas: vec![area(VmFlags::READ | VmFlags::SHARED, Some(shm.clone()))],
        ..MmSnapshot::default()
    });
    let cred = recorder.create_entry(entity::PROC).unwrap();

    assert_eq!(
        recorder.record_shared_mappings(&cred, &task, true),
        Ok(Recorded::Emitted)
    );
    let reads = sink.relations();
    assert_eq!(reads.len(), 1);
    assert_eq!(reads[0].kind(), relation::SH_READ);
    assert_eq!(reads[0].from.id, shm.prov.id());
}

#[test]
fn test_process_table_lookup() {
    let recorder = recorder(Arc::new(MemorySink::new()));
    let table = ProcessTable::new();
    table.insert(recorder.create_process(Arc::new(SimTask::new(900).with_vpid(9))).unwrap());

    let process = table.from_vpid(9).unwrap();
    assert_eq!(process.task().pid(), 900);

    let err = table.from_vpid(10).unwrap_err();
    assert_eq!(prov_capture::hook_code(&Err(err)), -2);
}

#[test]
fn test_channel_sink_consumer() {
    let (sink, receiver) = ChannelSink::bounded(16);
    let recorder = Recorder::new(
        &RecorderConfig::default(),
        Arc::new(PolicyGate::from_config(&PolicyConfig::default()).unwrap()),
        Arc::new(sink),
    )
    .unwrap();

    let consumer = thread::spawn(move || {
        let mut relations = 0;
        for batch in receiver {
            relations += batch
                .iter()
                .filter(|record| matches!(record, ProvRecord::Relation(_)))
                .count();
        }
        relations
    });

    let task = recorder.create_entry(activity::TASK).unwrap();
    task.set_tracked();
    for path in ["/a", "/b", "/c"] {
        let file = recorder.create_entry(entity::INODE_FILE).unwrap();
        recorder
            .record_relation(relation::READ, &file, &task, Some(path), 0)
            .unwrap();
    }
    drop(recorder);

    assert_eq!(consumer.join().unwrap(), 3);
}
