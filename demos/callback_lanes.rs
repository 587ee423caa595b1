// Callback-style keyed serial queue
//
// The operator receives each payload with a completion handle. Completion may
// be signalled right away or later from another thread; either way the next
// payload of that channel is only dispatched afterwards.

use laneq::{Done, KeyedSerialQueue};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn main() {
    laneq::init();

    let (tx, rx) = mpsc::channel::<Done<String, u32, ()>>();
    let queue = KeyedSerialQueue::new(move |job: u32, done: Done<String, u32, ()>| {
        println!("{} -> job {job}", done.key());
        if job % 2 == 0 {
            done.done();
        } else {
            // hand odd jobs to a worker that finishes them later
            let _ = tx.send(done);
        }
    });

    let worker = thread::spawn(move || {
        for done in rx {
            thread::sleep(Duration::from_millis(20));
            done.done();
        }
    });

    for job in 0..6 {
        queue.enqueue("printer".to_string(), job);
        queue.enqueue("scanner".to_string(), job);
    }

    while !queue.is_idle() {
        thread::sleep(Duration::from_millis(10));
    }
    println!("all lanes drained");

    drop(queue);
    let _ = worker.join();
}
