mod btree_test;
